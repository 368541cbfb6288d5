//! The history manager: records journal entries and walks the cursor.
//!
//! A `HistoryManager` owns the in-memory journal for one session and is
//! shared behind an `Arc`. Every operation that touches the journal holds
//! its lock across the storage call, so overlapping requests are applied
//! one after the other.

use std::sync::Arc;

use retread_core::change::{ChangeRecord, NewChangeRecord};
use retread_core::clock::Clock;
use retread_core::error::DomainError;
use retread_core::repository::{JournalStore, RowStore};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::application::query_handlers::{
    HistoryEntryView, HistoryStats, history_entries, history_stats,
};
use crate::config::HistoryConfig;
use crate::domain::journal::{Direction, HistoryJournal, Step};

/// Session-scoped change history with linear undo and redo.
pub struct HistoryManager {
    journal: Mutex<HistoryJournal>,
    store: Arc<dyn JournalStore>,
    rows: Arc<dyn RowStore>,
    clock: Arc<dyn Clock>,
    config: HistoryConfig,
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HistoryManager {
    /// Creates a manager with an empty journal.
    #[must_use]
    pub fn new(
        store: Arc<dyn JournalStore>,
        rows: Arc<dyn RowStore>,
        clock: Arc<dyn Clock>,
        config: HistoryConfig,
    ) -> Self {
        Self {
            journal: Mutex::new(HistoryJournal::new(config.capacity)),
            store,
            rows,
            clock,
            config,
        }
    }

    /// The tunables this manager was built with.
    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    /// The row store undo and redo are applied to.
    #[must_use]
    pub fn rows(&self) -> &Arc<dyn RowStore> {
        &self.rows
    }

    /// Takes exclusive hold of the journal.
    ///
    /// Row mutations that must be journaled in the order they hit storage
    /// run through the returned session; undo, redo, reloads and other
    /// sessions wait until it is consumed or dropped.
    pub async fn session(&self) -> HistorySession<'_> {
        HistorySession {
            manager: self,
            journal: self.journal.lock().await,
        }
    }

    /// Persists a new journal entry and makes it the newest applied entry.
    ///
    /// Any redoable entries are discarded and the oldest entries are
    /// evicted beyond capacity.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the entry could not later be
    /// reversed or replayed, or the journal store's error. On error the
    /// in-memory journal is untouched.
    pub async fn record(&self, record: NewChangeRecord) -> Result<ChangeRecord, DomainError> {
        self.session().await.record(record).await
    }

    /// Reverses the entry at the cursor and moves the cursor back by one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NothingToUndo` at the start of the journal,
    /// `MissingSnapshot` or `UnsupportedOperation` for an entry that cannot
    /// be reversed, or the row store's error. The cursor is unchanged on
    /// every error.
    pub async fn undo(&self) -> Result<ChangeRecord, DomainError> {
        self.walk(Direction::Undo).await
    }

    /// Replays the entry after the cursor and moves the cursor forward by
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NothingToRedo` at the end of the journal,
    /// `MissingSnapshot` or `UnsupportedOperation` for an entry that cannot
    /// be replayed, or the row store's error. The cursor is unchanged on
    /// every error.
    pub async fn redo(&self) -> Result<ChangeRecord, DomainError> {
        self.walk(Direction::Redo).await
    }

    async fn walk(&self, direction: Direction) -> Result<ChangeRecord, DomainError> {
        let mut journal = self.journal.lock().await;
        let planned = match direction {
            Direction::Undo => journal.plan_undo(),
            Direction::Redo => journal.plan_redo(),
        };
        let step = planned.inspect_err(|e| warn!(?direction, error = %e, "cannot plan step"))?;

        self.apply(&step).await?;
        journal.commit(&step)?;

        debug!(
            ?direction,
            change_id = %step.record.id,
            position = journal.current_position(),
            "step applied"
        );
        Ok(step.record)
    }

    async fn apply(&self, step: &Step) -> Result<(), DomainError> {
        step.effect.apply(self.rows.as_ref()).await.inspect_err(|e| {
            warn!(
                direction = ?step.direction,
                change_id = %step.record.id,
                table = %step.record.table,
                record_id = %step.record.record_id,
                error = %e,
                "step failed, cursor unchanged"
            );
        })
    }

    /// Whether an entry is available to undo.
    pub async fn can_undo(&self) -> bool {
        self.journal.lock().await.can_undo()
    }

    /// Whether an entry is available to redo.
    pub async fn can_redo(&self) -> bool {
        self.journal.lock().await.can_redo()
    }

    /// Index of the last applied entry, `-1` when none.
    pub async fn current_position(&self) -> i64 {
        self.journal.lock().await.current_position()
    }

    /// Replaces the in-memory journal with the newest durable entries.
    ///
    /// Loads `limit` entries (the configured page size when `None`, never
    /// more than the capacity) and places the cursor at the newest one.
    /// Returns the number of entries loaded.
    ///
    /// # Errors
    ///
    /// Returns the journal store's error; the in-memory journal is then
    /// left as it was.
    pub async fn load_history(&self, limit: Option<usize>) -> Result<usize, DomainError> {
        let limit = limit
            .unwrap_or(self.config.page_size)
            .min(self.config.capacity);

        let mut journal = self.journal.lock().await;
        let entries = self.store.recent(limit).await?;
        *journal = HistoryJournal::from_entries(entries, self.config.capacity);

        info!(loaded = journal.len(), limit, "history reloaded");
        Ok(journal.len())
    }

    /// Deletes durable entries older than `days_to_keep` days (the
    /// configured retention when `None`).
    ///
    /// The in-memory journal and cursor are not touched. Storage failures
    /// are logged and reported as zero rows removed.
    pub async fn clear_old_history(&self, days_to_keep: Option<u32>) -> u64 {
        let days = days_to_keep.unwrap_or(self.config.retention_days);
        let cutoff = self.clock.days_ago(days);

        match self.store.delete_older_than(cutoff).await {
            Ok(removed) => {
                info!(removed, days, %cutoff, "old history cleared");
                removed
            }
            Err(e) => {
                warn!(days, %cutoff, error = %e, "failed to clear old history");
                0
            }
        }
    }

    /// Summary of the in-memory journal.
    pub async fn stats(&self) -> HistoryStats {
        history_stats(&*self.journal.lock().await)
    }

    /// The in-memory entries, oldest first.
    pub async fn entries(&self) -> Vec<HistoryEntryView> {
        history_entries(&*self.journal.lock().await)
    }
}

/// Exclusive access to the journal for one row mutation and its entry.
pub struct HistorySession<'a> {
    manager: &'a HistoryManager,
    journal: MutexGuard<'a, HistoryJournal>,
}

impl HistorySession<'_> {
    /// The row store the mutation is applied to.
    #[must_use]
    pub fn rows(&self) -> &dyn RowStore {
        self.manager.rows.as_ref()
    }

    /// Persists `record` and makes it the newest applied entry, releasing
    /// the journal afterwards.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an entry that could not later
    /// be reversed or replayed, or the journal store's error. On error the
    /// in-memory journal is untouched.
    pub async fn record(mut self, record: NewChangeRecord) -> Result<ChangeRecord, DomainError> {
        record.validate()?;
        let stored = self
            .manager
            .store
            .append(record, self.manager.clock.now())
            .await?;
        let dropped = self.journal.push(stored.clone());

        debug!(
            change_id = %stored.id,
            operation = %stored.operation,
            table = %stored.table,
            record_id = %stored.record_id,
            dropped,
            "change recorded"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use retread_core::change::{ChangeRecord, NewChangeRecord, OperationKind};
    use retread_core::error::DomainError;
    use retread_core::table::TableName;
    use retread_test_support::{
        FailingJournalStore, FixedClock, InMemoryJournalStore, InMemoryRowStore, SteppingClock,
        client, fixed_now, stock_item,
    };
    use uuid::Uuid;

    use super::HistoryManager;
    use crate::config::HistoryConfig;

    struct Fixture {
        manager: HistoryManager,
        journal: Arc<InMemoryJournalStore>,
        rows: Arc<InMemoryRowStore>,
    }

    fn fixture_with(rows: InMemoryRowStore, config: HistoryConfig) -> Fixture {
        let journal = Arc::new(InMemoryJournalStore::new());
        let rows = Arc::new(rows);
        let manager = HistoryManager::new(
            journal.clone(),
            rows.clone(),
            Arc::new(FixedClock(fixed_now())),
            config,
        );
        Fixture {
            manager,
            journal,
            rows,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(InMemoryRowStore::new(), HistoryConfig::default())
    }

    #[tokio::test]
    async fn test_record_moves_cursor_to_newest_entry() {
        // Arrange
        let f = fixture();

        // Act
        for i in 0..3 {
            let row = client(&format!("c{i}"), "Acme");
            f.manager
                .record(NewChangeRecord::create(row, "created"))
                .await
                .unwrap();
        }

        // Assert
        assert_eq!(f.manager.current_position().await, 2);
        assert!(f.manager.can_undo().await);
        assert!(!f.manager.can_redo().await);
        assert_eq!(f.journal.append_count(), 3);
    }

    #[tokio::test]
    async fn test_record_returns_stored_entry_with_generated_id() {
        let f = fixture();

        let stored = f
            .manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();

        assert_eq!(stored.occurred_at, fixed_now());
        assert_eq!(f.journal.records()[0].id, stored.id);
    }

    #[tokio::test]
    async fn test_record_rejects_entry_missing_snapshot() {
        // Arrange
        let f = fixture();
        let mut record = NewChangeRecord::delete(stock_item("s9", "Rubber", 5), "deleted");
        record.prior_state = None;

        // Act
        let result = f.manager.record(record).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(f.journal.append_count(), 0);
        assert_eq!(f.manager.current_position().await, -1);
    }

    #[tokio::test]
    async fn test_record_failure_leaves_journal_untouched() {
        // Arrange
        let manager = HistoryManager::new(
            Arc::new(FailingJournalStore),
            Arc::new(InMemoryRowStore::new()),
            Arc::new(FixedClock(fixed_now())),
            HistoryConfig::default(),
        );

        // Act
        let result = manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(manager.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_undo_and_redo_of_update_restore_each_version() {
        // Arrange
        let f = fixture_with(
            InMemoryRowStore::with_rows([client("c1", "Acme Ltd")]),
            HistoryConfig::default(),
        );
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();
        f.manager
            .record(NewChangeRecord::update(
                client("c1", "Acme"),
                client("c1", "Acme Ltd"),
                "renamed",
            ))
            .await
            .unwrap();

        // Act
        let undone = f.manager.undo().await.unwrap();

        // Assert
        assert_eq!(undone.operation, OperationKind::Update);
        assert_eq!(
            f.rows.snapshot(TableName::Clients, "c1"),
            Some(client("c1", "Acme"))
        );
        assert!(f.manager.can_redo().await);

        // Act
        f.manager.redo().await.unwrap();

        // Assert
        assert_eq!(
            f.rows.snapshot(TableName::Clients, "c1"),
            Some(client("c1", "Acme Ltd"))
        );
        assert!(!f.manager.can_redo().await);
    }

    #[tokio::test]
    async fn test_undo_and_redo_of_delete_reinsert_then_remove_again() {
        // Arrange
        let f = fixture();
        f.manager
            .record(NewChangeRecord::delete(stock_item("s9", "Rubber", 5), "deleted"))
            .await
            .unwrap();

        // Act
        f.manager.undo().await.unwrap();

        // Assert
        assert_eq!(
            f.rows.snapshot(TableName::StockItems, "s9"),
            Some(stock_item("s9", "Rubber", 5))
        );

        // Act
        f.manager.redo().await.unwrap();

        // Assert
        assert_eq!(f.rows.snapshot(TableName::StockItems, "s9"), None);
        assert_eq!(f.manager.current_position().await, 0);
    }

    #[tokio::test]
    async fn test_undo_and_redo_of_create_remove_then_reinsert() {
        let f = fixture_with(
            InMemoryRowStore::with_rows([client("c1", "Acme")]),
            HistoryConfig::default(),
        );
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();

        f.manager.undo().await.unwrap();
        assert!(f.rows.is_empty());

        f.manager.redo().await.unwrap();
        assert_eq!(
            f.rows.snapshot(TableName::Clients, "c1"),
            Some(client("c1", "Acme"))
        );
    }

    #[tokio::test]
    async fn test_undo_everything_then_redo_everything_restores_final_state() {
        // Arrange
        let f = fixture_with(
            InMemoryRowStore::with_rows([client("c1", "Acme Ltd"), client("c2", "Brava")]),
            HistoryConfig::default(),
        );
        for record in [
            NewChangeRecord::create(client("c1", "Acme"), "created"),
            NewChangeRecord::create(client("c2", "Brava"), "created"),
            NewChangeRecord::update(client("c1", "Acme"), client("c1", "Acme Ltd"), "renamed"),
        ] {
            f.manager.record(record).await.unwrap();
        }

        // Act
        while f.manager.can_undo().await {
            f.manager.undo().await.unwrap();
        }

        // Assert
        assert_eq!(f.manager.current_position().await, -1);
        assert!(f.rows.is_empty());
        assert!(matches!(
            f.manager.undo().await,
            Err(DomainError::NothingToUndo)
        ));

        // Act
        while f.manager.can_redo().await {
            f.manager.redo().await.unwrap();
        }

        // Assert
        assert_eq!(f.manager.current_position().await, 2);
        assert_eq!(
            f.rows.snapshot(TableName::Clients, "c1"),
            Some(client("c1", "Acme Ltd"))
        );
        assert_eq!(
            f.rows.snapshot(TableName::Clients, "c2"),
            Some(client("c2", "Brava"))
        );
        assert!(matches!(
            f.manager.redo().await,
            Err(DomainError::NothingToRedo)
        ));
    }

    #[tokio::test]
    async fn test_record_after_undo_discards_redo() {
        // Arrange
        let f = fixture_with(
            InMemoryRowStore::with_rows([client("c1", "Acme")]),
            HistoryConfig::default(),
        );
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();
        f.manager.undo().await.unwrap();
        assert!(f.manager.can_redo().await);

        // Act
        f.manager
            .record(NewChangeRecord::create(client("c2", "Brava"), "created"))
            .await
            .unwrap();

        // Assert
        assert!(!f.manager.can_redo().await);
        let stats = f.manager.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.current_position, 0);
    }

    #[tokio::test]
    async fn test_redo_with_missing_new_state_leaves_cursor_unchanged() {
        // Arrange
        let f = fixture();
        f.journal.seed(ChangeRecord {
            id: Uuid::new_v4(),
            operation: OperationKind::Create,
            table: TableName::Clients,
            record_id: "c1".to_owned(),
            prior_state: None,
            new_state: None,
            description: "legacy row".to_owned(),
            occurred_at: fixed_now(),
        });
        f.manager.load_history(None).await.unwrap();
        f.manager.undo().await.unwrap();

        // Act
        let result = f.manager.redo().await;

        // Assert
        assert!(matches!(result, Err(DomainError::MissingSnapshot { .. })));
        assert_eq!(f.manager.current_position().await, -1);
        assert!(f.manager.can_redo().await);
    }

    #[tokio::test]
    async fn test_unknown_operation_cannot_be_undone() {
        // Arrange
        let f = fixture();
        f.journal.seed(ChangeRecord {
            id: Uuid::new_v4(),
            operation: OperationKind::Unknown("MERGE".to_owned()),
            table: TableName::Clients,
            record_id: "c1".to_owned(),
            prior_state: None,
            new_state: Some(client("c1", "Acme")),
            description: String::new(),
            occurred_at: fixed_now(),
        });
        f.manager.load_history(None).await.unwrap();

        // Act
        let result = f.manager.undo().await;

        // Assert
        assert!(matches!(result, Err(DomainError::UnsupportedOperation(_))));
        assert_eq!(f.manager.current_position().await, 0);
    }

    #[tokio::test]
    async fn test_row_store_failure_during_undo_keeps_cursor() {
        // Arrange
        let f = fixture_with(
            InMemoryRowStore::with_rows([client("c1", "Acme")]),
            HistoryConfig::default(),
        );
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();
        f.rows.set_unavailable(true);

        // Act
        let result = f.manager.undo().await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(f.manager.current_position().await, 0);

        // Act
        f.rows.set_unavailable(false);
        f.manager.undo().await.unwrap();

        // Assert
        assert_eq!(f.manager.current_position().await, -1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_entries() {
        // Arrange
        let config = HistoryConfig {
            capacity: 2,
            ..HistoryConfig::default()
        };
        let f = fixture_with(InMemoryRowStore::new(), config);

        // Act
        for i in 0..3 {
            f.manager
                .record(NewChangeRecord::create(client(&format!("c{i}"), "x"), "created"))
                .await
                .unwrap();
        }

        // Assert
        let entries = f.manager.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].record.record_id, "c1");
        assert_eq!(f.manager.current_position().await, 1);
        assert_eq!(f.journal.records().len(), 3);
    }

    #[tokio::test]
    async fn test_load_history_takes_newest_page_with_cursor_at_tail() {
        // Arrange
        let config = HistoryConfig {
            capacity: 10,
            page_size: 2,
            ..HistoryConfig::default()
        };
        let f = fixture_with(InMemoryRowStore::new(), config);
        for i in 0..3 {
            f.manager
                .record(NewChangeRecord::create(client(&format!("c{i}"), "x"), "created"))
                .await
                .unwrap();
        }

        // Act
        let loaded = f.manager.load_history(None).await.unwrap();

        // Assert
        assert_eq!(loaded, 2);
        let entries = f.manager.entries().await;
        assert_eq!(entries[0].record.record_id, "c1");
        assert!(entries.iter().all(|entry| entry.applied));
        assert_eq!(f.manager.current_position().await, 1);
        assert!(!f.manager.can_redo().await);
    }

    #[tokio::test]
    async fn test_load_history_limit_is_capped_at_capacity() {
        let config = HistoryConfig {
            capacity: 2,
            ..HistoryConfig::default()
        };
        let f = fixture_with(InMemoryRowStore::new(), config);
        for i in 0..4 {
            f.journal.seed(ChangeRecord {
                id: Uuid::new_v4(),
                operation: OperationKind::Create,
                table: TableName::Clients,
                record_id: format!("c{i}"),
                prior_state: None,
                new_state: Some(client(&format!("c{i}"), "x")),
                description: String::new(),
                occurred_at: fixed_now() + Duration::minutes(i),
            });
        }

        let loaded = f.manager.load_history(Some(50)).await.unwrap();

        assert_eq!(loaded, 2);
    }

    #[tokio::test]
    async fn test_load_history_failure_keeps_current_journal() {
        // Arrange
        let f = fixture();
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();
        f.journal.set_unavailable(true);

        // Act
        let result = f.manager.load_history(None).await;

        // Assert
        assert!(result.is_err());
        assert_eq!(f.manager.stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn test_clear_old_history_removes_only_old_durable_rows() {
        // Arrange
        let journal = Arc::new(InMemoryJournalStore::new());
        let clock = Arc::new(SteppingClock::new(fixed_now() - Duration::days(45)));
        let manager = HistoryManager::new(
            journal.clone(),
            Arc::new(InMemoryRowStore::new()),
            clock.clone(),
            HistoryConfig::default(),
        );
        manager
            .record(NewChangeRecord::create(client("old", "Old"), "created"))
            .await
            .unwrap();
        clock.set(fixed_now() - Duration::days(5));
        manager
            .record(NewChangeRecord::create(client("new", "New"), "created"))
            .await
            .unwrap();
        clock.set(fixed_now());

        // Act
        let removed = manager.clear_old_history(Some(30)).await;

        // Assert
        assert_eq!(removed, 1);
        let remaining = journal.records();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].record_id, "new");
        assert_eq!(manager.stats().await.total_entries, 2);
        assert_eq!(manager.current_position().await, 1);
    }

    #[tokio::test]
    async fn test_clear_old_history_swallows_store_failure() {
        let manager = HistoryManager::new(
            Arc::new(FailingJournalStore),
            Arc::new(InMemoryRowStore::new()),
            Arc::new(FixedClock(fixed_now())),
            HistoryConfig::default(),
        );

        let removed = manager.clear_old_history(None).await;

        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_clear_old_history_with_huge_retention_removes_nothing() {
        // Arrange
        let f = fixture();
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();

        // Act
        let removed = f.manager.clear_old_history(Some(u32::MAX)).await;

        // Assert
        assert_eq!(removed, 0);
        assert_eq!(f.journal.records().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_undo_calls_are_serialized() {
        // Arrange
        let f = fixture_with(
            InMemoryRowStore::with_rows([client("c1", "Acme"), client("c2", "Brava")]),
            HistoryConfig::default(),
        );
        f.manager
            .record(NewChangeRecord::create(client("c1", "Acme"), "created"))
            .await
            .unwrap();
        f.manager
            .record(NewChangeRecord::create(client("c2", "Brava"), "created"))
            .await
            .unwrap();
        let manager = Arc::new(f.manager);

        // Act
        let (a, b, c) = tokio::join!(manager.undo(), manager.undo(), manager.undo());

        // Assert
        let outcomes = [a, b, c];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 2);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(DomainError::NothingToUndo)))
        );
        assert_eq!(manager.current_position().await, -1);
        assert!(f.rows.is_empty());
    }
}
