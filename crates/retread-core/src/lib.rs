//! Retread Core: shared domain types for the change history.
//!
//! This crate defines the row schemas, change records, error type and the
//! storage traits every other crate depends on. It contains no
//! infrastructure code.

pub mod change;
pub mod clock;
pub mod error;
pub mod repository;
pub mod row;
pub mod table;
