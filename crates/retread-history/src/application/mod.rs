//! Orchestration of journal state and storage.

pub mod history_manager;
pub mod query_handlers;
pub mod tracked_rows;
