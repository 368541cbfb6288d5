//! Retread: `PostgreSQL` storage for the change history and business tables.

pub mod pg_journal_store;
pub mod pg_row_store;
pub mod schema;

use retread_core::error::DomainError;

/// Maps a sqlx error onto the domain's infrastructure error.
fn infrastructure(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {e}"))
}
