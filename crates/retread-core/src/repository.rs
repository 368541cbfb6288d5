//! Storage abstractions the change history depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::change::{ChangeRecord, NewChangeRecord};
use crate::error::DomainError;
use crate::row::RowSnapshot;
use crate::table::TableName;

/// Durable storage for journal entries.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Persist a new entry and return it with its generated identifier.
    async fn append(
        &self,
        record: NewChangeRecord,
        occurred_at: DateTime<Utc>,
    ) -> Result<ChangeRecord, DomainError>;

    /// Load a single entry by identifier.
    async fn get(&self, id: Uuid) -> Result<Option<ChangeRecord>, DomainError>;

    /// Load the newest `limit` entries, returned oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChangeRecord>, DomainError>;

    /// Delete a single entry. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Delete every entry that occurred strictly before `cutoff`.
    /// Returns the number of rows removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;
}

/// Storage for the business tables the history mutates.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Load a row by table and identifier.
    async fn fetch(&self, table: TableName, id: &str) -> Result<Option<RowSnapshot>, DomainError>;

    /// Load every row of a table, ordered by identifier.
    async fn list(&self, table: TableName) -> Result<Vec<RowSnapshot>, DomainError>;

    /// Insert a row under its own identifier.
    async fn insert(&self, row: &RowSnapshot) -> Result<(), DomainError>;

    /// Overwrite an existing row. Returns `DomainError::RowNotFound` if it
    /// does not exist.
    async fn update(&self, row: &RowSnapshot) -> Result<(), DomainError>;

    /// Delete a row. Returns whether a row was removed.
    async fn delete(&self, table: TableName, id: &str) -> Result<bool, DomainError>;
}
