//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::change::OperationKind;
use crate::table::TableName;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business row was not found.
    #[error("row not found: {table}/{id}")]
    RowNotFound {
        /// The table that was searched.
        table: TableName,
        /// The row identifier.
        id: String,
    },

    /// A table name did not match any known business table.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// A journal entry lacks the snapshot needed to apply it.
    #[error("change {record_id} ({operation}) has no {state}")]
    MissingSnapshot {
        /// The journal entry that cannot be applied.
        record_id: Uuid,
        /// The entry's operation kind.
        operation: OperationKind,
        /// Which snapshot is absent (`prior_state` or `new_state`).
        state: &'static str,
    },

    /// A journal entry carries an operation kind that cannot be applied.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Undo was requested with the cursor before the first entry.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo was requested with the cursor at the last entry.
    #[error("nothing to redo")]
    NothingToRedo,

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
