//! Data access that journals every mutation.
//!
//! Each mutation is applied to the row store first and then recorded in the
//! history, both inside one [`HistorySession`], so concurrent mutations are
//! journaled in the order they reached storage. The two writes are not
//! transactional: if the journal write fails the row change stays in place
//! and the error is returned.

use std::sync::Arc;

use retread_core::change::{ChangeRecord, NewChangeRecord, OperationKind};
use retread_core::error::DomainError;
use retread_core::repository::RowStore;
use retread_core::row::RowSnapshot;
use retread_core::table::TableName;

use crate::application::history_manager::{HistoryManager, HistorySession};
use crate::domain::describe::{Describer, TableDescriber};

/// Row store wrapper that records a journal entry for every mutation.
#[derive(Clone)]
pub struct TrackedRows {
    history: Arc<HistoryManager>,
    describer: Arc<dyn Describer>,
}

impl std::fmt::Debug for TrackedRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedRows")
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl TrackedRows {
    /// Wraps the manager's row store, describing entries with
    /// [`TableDescriber`].
    #[must_use]
    pub fn new(history: Arc<HistoryManager>) -> Self {
        Self {
            history,
            describer: Arc::new(TableDescriber),
        }
    }

    /// Replaces the describer used when no description is given.
    #[must_use]
    pub fn with_describer(mut self, describer: Arc<dyn Describer>) -> Self {
        self.describer = describer;
        self
    }

    /// Inserts `row` and records a Create entry.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an invalid row, or the error
    /// from the row store or the journal.
    pub async fn create(
        &self,
        row: RowSnapshot,
        description: Option<String>,
    ) -> Result<ChangeRecord, DomainError> {
        row.validate()?;
        let session = self.history.session().await;
        session.rows().insert(&row).await?;
        let description = self.describe(description, &OperationKind::Create, &row);
        session
            .record(NewChangeRecord::create(row, description))
            .await
    }

    /// Overwrites the row with the same id and records an Update entry
    /// carrying the previous version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RowNotFound` if the row does not exist,
    /// `DomainError::Validation` for an invalid row, or the error from the
    /// row store or the journal.
    pub async fn update(
        &self,
        row: RowSnapshot,
        description: Option<String>,
    ) -> Result<ChangeRecord, DomainError> {
        row.validate()?;
        let session = self.history.session().await;
        let prior = existing(&session, row.table(), row.id()).await?;
        session.rows().update(&row).await?;
        let description = self.describe(description, &OperationKind::Update, &row);
        session
            .record(NewChangeRecord::update(prior, row, description))
            .await
    }

    /// Removes the row and records a Delete entry carrying it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RowNotFound` if the row does not exist, or the
    /// error from the row store or the journal.
    pub async fn delete(
        &self,
        table: TableName,
        id: &str,
        description: Option<String>,
    ) -> Result<ChangeRecord, DomainError> {
        let session = self.history.session().await;
        let prior = existing(&session, table, id).await?;
        session.rows().delete(table, id).await?;
        let description = self.describe(description, &OperationKind::Delete, &prior);
        session
            .record(NewChangeRecord::delete(prior, description))
            .await
    }

    /// Loads a row without journaling anything.
    ///
    /// # Errors
    ///
    /// Returns the row store's error.
    pub async fn get(&self, table: TableName, id: &str) -> Result<Option<RowSnapshot>, DomainError> {
        self.history.rows().fetch(table, id).await
    }

    /// Lists a table without journaling anything.
    ///
    /// # Errors
    ///
    /// Returns the row store's error.
    pub async fn list(&self, table: TableName) -> Result<Vec<RowSnapshot>, DomainError> {
        self.history.rows().list(table).await
    }

    fn describe(
        &self,
        description: Option<String>,
        operation: &OperationKind,
        row: &RowSnapshot,
    ) -> String {
        description
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| self.describer.describe(operation, row))
    }
}

async fn existing(
    session: &HistorySession<'_>,
    table: TableName,
    id: &str,
) -> Result<RowSnapshot, DomainError> {
    session
        .rows()
        .fetch(table, id)
        .await?
        .ok_or_else(|| DomainError::RowNotFound {
            table,
            id: id.to_owned(),
        })
}
