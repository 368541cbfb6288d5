//! Test row stores: `RowStore` implementations for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use retread_core::error::DomainError;
use retread_core::repository::RowStore;
use retread_core::row::RowSnapshot;
use retread_core::table::TableName;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// A row store that keeps every table in memory, keyed by `(table, id)`.
///
/// Like `InMemoryJournalStore`, it can be switched into an "unavailable"
/// mode to simulate a backend outage between two calls.
#[derive(Debug, Default)]
pub struct InMemoryRowStore {
    rows: Mutex<BTreeMap<(TableName, String), RowSnapshot>>,
    unavailable: AtomicBool,
}

impl InMemoryRowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `rows`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = RowSnapshot>) -> Self {
        let store = Self::new();
        {
            let mut map = store.rows.lock().unwrap();
            for row in rows {
                map.insert((row.table(), row.id().to_owned()), row);
            }
        }
        store
    }

    /// Returns the current row, bypassing the availability switch.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn snapshot(&self, table: TableName, id: &str) -> Option<RowSnapshot> {
        self.rows
            .lock()
            .unwrap()
            .get(&(table, id.to_owned()))
            .cloned()
    }

    /// Number of rows across all tables.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Whether the store holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn fetch(&self, table: TableName, id: &str) -> Result<Option<RowSnapshot>, DomainError> {
        self.check()?;
        Ok(self.snapshot(table, id))
    }

    async fn list(&self, table: TableName) -> Result<Vec<RowSnapshot>, DomainError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((row_table, _), _)| *row_table == table)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn insert(&self, row: &RowSnapshot) -> Result<(), DomainError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let key = (row.table(), row.id().to_owned());
        if rows.contains_key(&key) {
            return Err(DomainError::Validation(format!(
                "{}/{} already exists",
                key.0, key.1
            )));
        }
        rows.insert(key, row.clone());
        Ok(())
    }

    async fn update(&self, row: &RowSnapshot) -> Result<(), DomainError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&(row.table(), row.id().to_owned())) {
            Some(existing) => {
                *existing = row.clone();
                Ok(())
            }
            None => Err(DomainError::RowNotFound {
                table: row.table(),
                id: row.id().to_owned(),
            }),
        }
    }

    async fn delete(&self, table: TableName, id: &str) -> Result<bool, DomainError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .remove(&(table, id.to_owned()))
            .is_some())
    }
}

/// A row store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingRowStore;

#[async_trait]
impl RowStore for FailingRowStore {
    async fn fetch(
        &self,
        _table: TableName,
        _id: &str,
    ) -> Result<Option<RowSnapshot>, DomainError> {
        Err(unavailable())
    }

    async fn list(&self, _table: TableName) -> Result<Vec<RowSnapshot>, DomainError> {
        Err(unavailable())
    }

    async fn insert(&self, _row: &RowSnapshot) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn update(&self, _row: &RowSnapshot) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn delete(&self, _table: TableName, _id: &str) -> Result<bool, DomainError> {
        Err(unavailable())
    }
}
