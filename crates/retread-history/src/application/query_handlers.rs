//! Query handlers for the change history.
//!
//! Read-only views computed from the in-memory journal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use retread_core::change::{ChangeRecord, OperationKind};
use retread_core::table::TableName;
use serde::Serialize;

use crate::domain::journal::HistoryJournal;

/// Summary of the in-memory journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Number of entries held in memory.
    pub total_entries: usize,
    /// Index of the last applied entry, `-1` when none.
    pub current_position: i64,
    /// Whether `undo` would find an entry.
    pub can_undo: bool,
    /// Whether `redo` would find an entry.
    pub can_redo: bool,
    /// Entries at or before the cursor.
    pub undoable: usize,
    /// Entries after the cursor.
    pub redoable: usize,
    /// Create entries held.
    pub creates: usize,
    /// Update entries held.
    pub updates: usize,
    /// Delete entries held.
    pub deletes: usize,
    /// Entry count per table.
    pub by_table: BTreeMap<TableName, usize>,
    /// Timestamp of the oldest entry held.
    pub oldest: Option<DateTime<Utc>>,
    /// Timestamp of the newest entry held.
    pub newest: Option<DateTime<Utc>>,
}

/// A journal entry together with its position relative to the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntryView {
    /// Index in the journal, oldest first.
    pub position: usize,
    /// Whether the entry is currently applied (at or before the cursor).
    pub applied: bool,
    /// The entry itself.
    #[serde(flatten)]
    pub record: ChangeRecord,
}

/// Computes [`HistoryStats`] from the journal's current state.
#[must_use]
pub fn history_stats(journal: &HistoryJournal) -> HistoryStats {
    let mut stats = HistoryStats {
        total_entries: journal.len(),
        current_position: journal.current_position(),
        can_undo: journal.can_undo(),
        can_redo: journal.can_redo(),
        undoable: 0,
        redoable: 0,
        creates: 0,
        updates: 0,
        deletes: 0,
        by_table: BTreeMap::new(),
        oldest: None,
        newest: None,
    };

    for (index, record) in journal.entries().enumerate() {
        if journal.is_applied(index) {
            stats.undoable += 1;
        } else {
            stats.redoable += 1;
        }
        match record.operation {
            OperationKind::Create => stats.creates += 1,
            OperationKind::Update => stats.updates += 1,
            OperationKind::Delete => stats.deletes += 1,
            OperationKind::Unknown(_) => {}
        }
        *stats.by_table.entry(record.table).or_default() += 1;
        stats.oldest = Some(stats.oldest.map_or(record.occurred_at, |t| t.min(record.occurred_at)));
        stats.newest = Some(stats.newest.map_or(record.occurred_at, |t| t.max(record.occurred_at)));
    }
    stats
}

/// Lists the journal's entries, oldest first, flagged applied or redoable.
#[must_use]
pub fn history_entries(journal: &HistoryJournal) -> Vec<HistoryEntryView> {
    journal
        .entries()
        .enumerate()
        .map(|(position, record)| HistoryEntryView {
            position,
            applied: journal.is_applied(position),
            record: record.clone(),
        })
        .collect()
}
