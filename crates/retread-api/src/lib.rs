//! Retread API: HTTP surface for the change history and the business
//! tables it journals.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
