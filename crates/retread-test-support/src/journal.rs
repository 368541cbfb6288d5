//! Test journal stores: `JournalStore` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use retread_core::change::{ChangeRecord, NewChangeRecord};
use retread_core::error::DomainError;
use retread_core::repository::JournalStore;
use uuid::Uuid;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// A journal store that keeps entries in memory, in insertion order.
///
/// It can be switched into an "unavailable" mode in which every call fails
/// with an infrastructure error, to exercise failure paths mid-scenario.
#[derive(Debug, Default)]
pub struct InMemoryJournalStore {
    records: Mutex<Vec<ChangeRecord>>,
    unavailable: AtomicBool,
    appends: AtomicUsize,
}

impl InMemoryJournalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-built record verbatim, bypassing validation. Used
    /// to simulate rows written by older or buggy clients.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, record: ChangeRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// Returns a snapshot of all stored records in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records(&self) -> Vec<ChangeRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of successful `append` calls.
    pub fn append_count(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
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
impl JournalStore for InMemoryJournalStore {
    async fn append(
        &self,
        record: NewChangeRecord,
        occurred_at: DateTime<Utc>,
    ) -> Result<ChangeRecord, DomainError> {
        self.check()?;
        let stored = ChangeRecord {
            id: Uuid::now_v7(),
            operation: record.operation,
            table: record.table,
            record_id: record.record_id,
            prior_state: record.prior_state,
            new_state: record.new_state,
            description: record.description,
            occurred_at,
        };
        self.records.lock().unwrap().push(stored.clone());
        self.appends.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ChangeRecord>, DomainError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChangeRecord>, DomainError> {
        self.check()?;
        let mut records = self.records.lock().unwrap().clone();
        // Stable sort keeps insertion order among equal timestamps.
        records.sort_by_key(|record| record.occurred_at);
        let skip = records.len().saturating_sub(limit);
        Ok(records.into_iter().skip(skip).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() < before)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|record| record.occurred_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

/// A journal store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingJournalStore;

#[async_trait]
impl JournalStore for FailingJournalStore {
    async fn append(
        &self,
        _record: NewChangeRecord,
        _occurred_at: DateTime<Utc>,
    ) -> Result<ChangeRecord, DomainError> {
        Err(unavailable())
    }

    async fn get(&self, _id: Uuid) -> Result<Option<ChangeRecord>, DomainError> {
        Err(unavailable())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<ChangeRecord>, DomainError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        Err(unavailable())
    }
}
