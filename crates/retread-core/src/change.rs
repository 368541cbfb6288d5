//! Journaled mutations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::row::RowSnapshot;
use crate::table::TableName;

/// The kind of mutation a change record describes.
///
/// Rows rehydrated from storage with an unrecognised kind are kept as
/// `Unknown` so they can be listed, but they can never be applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum OperationKind {
    /// A row was inserted.
    Create,
    /// A row was overwritten.
    Update,
    /// A row was removed.
    Delete,
    /// A kind this build does not know how to apply.
    Unknown(String),
}

impl OperationKind {
    /// The storage representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
            OperationKind::Unknown(raw) => raw,
        }
    }
}

impl From<String> for OperationKind {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CREATE" => OperationKind::Create,
            "UPDATE" => OperationKind::Update,
            "DELETE" => OperationKind::Delete,
            _ => OperationKind::Unknown(raw),
        }
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Identifier generated by the journal store on insert.
    pub id: Uuid,
    /// What kind of mutation was journaled.
    pub operation: OperationKind,
    /// The affected table.
    pub table: TableName,
    /// Identifier of the affected row.
    pub record_id: String,
    /// Full row before the mutation (absent for creates).
    pub prior_state: Option<RowSnapshot>,
    /// Full row after the mutation (absent for deletes).
    pub new_state: Option<RowSnapshot>,
    /// Human-readable label.
    pub description: String,
    /// When the original mutation happened.
    pub occurred_at: DateTime<Utc>,
}

/// A journal entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChangeRecord {
    /// What kind of mutation is being journaled.
    pub operation: OperationKind,
    /// The affected table.
    pub table: TableName,
    /// Identifier of the affected row.
    pub record_id: String,
    /// Full row before the mutation.
    pub prior_state: Option<RowSnapshot>,
    /// Full row after the mutation.
    pub new_state: Option<RowSnapshot>,
    /// Human-readable label.
    pub description: String,
}

impl NewChangeRecord {
    /// Journals the insertion of `new_state`.
    #[must_use]
    pub fn create(new_state: RowSnapshot, description: impl Into<String>) -> Self {
        Self {
            operation: OperationKind::Create,
            table: new_state.table(),
            record_id: new_state.id().to_owned(),
            prior_state: None,
            new_state: Some(new_state),
            description: description.into(),
        }
    }

    /// Journals the overwrite of `prior_state` with `new_state`.
    #[must_use]
    pub fn update(
        prior_state: RowSnapshot,
        new_state: RowSnapshot,
        description: impl Into<String>,
    ) -> Self {
        Self {
            operation: OperationKind::Update,
            table: new_state.table(),
            record_id: new_state.id().to_owned(),
            prior_state: Some(prior_state),
            new_state: Some(new_state),
            description: description.into(),
        }
    }

    /// Journals the removal of `prior_state`.
    #[must_use]
    pub fn delete(prior_state: RowSnapshot, description: impl Into<String>) -> Self {
        Self {
            operation: OperationKind::Delete,
            table: prior_state.table(),
            record_id: prior_state.id().to_owned(),
            prior_state: Some(prior_state),
            new_state: None,
            description: description.into(),
        }
    }

    /// Checks that the entry can later be both reversed and replayed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a snapshot required by the
    /// operation kind is absent, if a snapshot belongs to another table or
    /// row, or if the kind is unknown.
    pub fn validate(&self) -> Result<(), DomainError> {
        let (needs_prior, needs_new) = match &self.operation {
            OperationKind::Create => (false, true),
            OperationKind::Update => (true, true),
            OperationKind::Delete => (true, false),
            OperationKind::Unknown(raw) => {
                return Err(DomainError::Validation(format!(
                    "cannot record unknown operation {raw:?}"
                )));
            }
        };
        if needs_prior && self.prior_state.is_none() {
            return Err(DomainError::Validation(format!(
                "{} of {}/{} requires prior_state",
                self.operation, self.table, self.record_id
            )));
        }
        if needs_new && self.new_state.is_none() {
            return Err(DomainError::Validation(format!(
                "{} of {}/{} requires new_state",
                self.operation, self.table, self.record_id
            )));
        }
        for snapshot in self.prior_state.iter().chain(self.new_state.iter()) {
            if snapshot.table() != self.table || snapshot.id() != self.record_id {
                return Err(DomainError::Validation(format!(
                    "snapshot {}/{} does not belong to {}/{}",
                    snapshot.table(),
                    snapshot.id(),
                    self.table,
                    self.record_id
                )));
            }
        }
        Ok(())
    }
}
