//! Retread: change history.
//!
//! Journals every create/update/delete against the business tables and
//! reverses or replays those mutations in linear order.

pub mod application;
pub mod config;
pub mod domain;
