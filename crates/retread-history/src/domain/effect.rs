//! Row effects derived from journal entries.

use retread_core::change::{ChangeRecord, OperationKind};
use retread_core::error::DomainError;
use retread_core::repository::RowStore;
use retread_core::row::RowSnapshot;
use retread_core::table::TableName;

/// A single mutation of a business table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Insert the row under its own identifier.
    Insert(RowSnapshot),
    /// Overwrite the existing row with this snapshot.
    Overwrite(RowSnapshot),
    /// Remove the row.
    Remove {
        /// The table holding the row.
        table: TableName,
        /// The row identifier.
        id: String,
    },
}

impl Effect {
    /// The effect that undoes `record`.
    ///
    /// Create → remove the row; Update → overwrite with `prior_state`;
    /// Delete → re-insert `prior_state`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingSnapshot` if `prior_state` is needed but
    /// absent, and `DomainError::UnsupportedOperation` for unknown kinds.
    pub fn reversal(record: &ChangeRecord) -> Result<Self, DomainError> {
        match &record.operation {
            OperationKind::Create => Ok(Effect::Remove {
                table: record.table,
                id: record.record_id.clone(),
            }),
            OperationKind::Update => Ok(Effect::Overwrite(prior_state(record)?)),
            OperationKind::Delete => Ok(Effect::Insert(prior_state(record)?)),
            OperationKind::Unknown(raw) => Err(DomainError::UnsupportedOperation(raw.clone())),
        }
    }

    /// The effect that replays `record`.
    ///
    /// Create → insert `new_state`; Update → overwrite with `new_state`;
    /// Delete → remove the row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingSnapshot` if `new_state` is needed but
    /// absent, and `DomainError::UnsupportedOperation` for unknown kinds.
    pub fn forward(record: &ChangeRecord) -> Result<Self, DomainError> {
        match &record.operation {
            OperationKind::Create => Ok(Effect::Insert(new_state(record)?)),
            OperationKind::Update => Ok(Effect::Overwrite(new_state(record)?)),
            OperationKind::Delete => Ok(Effect::Remove {
                table: record.table,
                id: record.record_id.clone(),
            }),
            OperationKind::Unknown(raw) => Err(DomainError::UnsupportedOperation(raw.clone())),
        }
    }

    /// Applies the effect to `rows`.
    ///
    /// Removing a row that is already gone succeeds: the table already
    /// matches the state the journal implies.
    ///
    /// # Errors
    ///
    /// Propagates any `DomainError` from the row store.
    pub async fn apply(&self, rows: &dyn RowStore) -> Result<(), DomainError> {
        match self {
            Effect::Insert(row) => rows.insert(row).await,
            Effect::Overwrite(row) => rows.update(row).await,
            Effect::Remove { table, id } => {
                if !rows.delete(*table, id).await? {
                    tracing::debug!(%table, id = %id, "row already absent");
                }
                Ok(())
            }
        }
    }
}

// Snapshots are checked against the entry's table and id: a rehydrated row
// can carry a snapshot for something else entirely.
fn checked(record: &ChangeRecord, snapshot: &RowSnapshot) -> Result<RowSnapshot, DomainError> {
    if snapshot.table() != record.table || snapshot.id() != record.record_id {
        return Err(DomainError::Validation(format!(
            "change {} carries a snapshot of {}/{}",
            record.id,
            snapshot.table(),
            snapshot.id()
        )));
    }
    Ok(snapshot.clone())
}

fn prior_state(record: &ChangeRecord) -> Result<RowSnapshot, DomainError> {
    match &record.prior_state {
        Some(snapshot) => checked(record, snapshot),
        None => Err(DomainError::MissingSnapshot {
            record_id: record.id,
            operation: record.operation.clone(),
            state: "prior_state",
        }),
    }
}

fn new_state(record: &ChangeRecord) -> Result<RowSnapshot, DomainError> {
    match &record.new_state {
        Some(snapshot) => checked(record, snapshot),
        None => Err(DomainError::MissingSnapshot {
            record_id: record.id,
            operation: record.operation.clone(),
            state: "new_state",
        }),
    }
}
