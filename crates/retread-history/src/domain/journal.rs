//! The in-memory journal and its cursor.
//!
//! The journal is an ordered list of change records plus a cursor pointing
//! at the last applied entry. Entries at or before the cursor can be undone;
//! entries after it can be redone. All moves are planned as a [`Step`] first
//! and committed only once the matching row effect has been applied, so the
//! cursor never runs ahead of storage.

use std::collections::VecDeque;

use retread_core::change::ChangeRecord;
use retread_core::error::DomainError;

use super::effect::Effect;

/// Which way a step moves the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reverse the entry at the cursor.
    Undo,
    /// Replay the entry after the cursor.
    Redo,
}

/// A planned cursor move: the entry it touches, the row effect to apply and
/// the cursor before and after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Undo or redo.
    pub direction: Direction,
    /// The entry being reversed or replayed.
    pub record: ChangeRecord,
    /// The row mutation that realises the move.
    pub effect: Effect,
    from: Option<usize>,
    to: Option<usize>,
}

/// Ordered change records plus the cursor.
#[derive(Debug, Clone)]
pub struct HistoryJournal {
    entries: VecDeque<ChangeRecord>,
    position: Option<usize>,
    capacity: usize,
}

impl HistoryJournal {
    /// Creates an empty journal holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            position: None,
            capacity: capacity.max(1),
        }
    }

    /// Creates a journal from rehydrated entries (oldest first), keeping the
    /// newest `capacity` of them, with every entry considered applied.
    #[must_use]
    pub fn from_entries(entries: Vec<ChangeRecord>, capacity: usize) -> Self {
        let mut journal = Self::new(capacity);
        let skip = entries.len().saturating_sub(journal.capacity);
        journal.entries = entries.into_iter().skip(skip).collect();
        journal.position = journal.entries.len().checked_sub(1);
        journal
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the journal holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the last applied entry, `-1` when nothing is applied.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn current_position(&self) -> i64 {
        self.position.map_or(-1, |position| position as i64)
    }

    /// Whether an entry is available to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.position.is_some()
    }

    /// Whether an entry is available to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.next_index() < self.entries.len()
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &ChangeRecord> {
        self.entries.iter()
    }

    /// Whether the entry at `index` is currently applied.
    #[must_use]
    pub fn is_applied(&self, index: usize) -> bool {
        self.position.is_some_and(|position| index <= position)
    }

    /// Appends a freshly recorded entry.
    ///
    /// Redoable entries are discarded first, the oldest entries are evicted
    /// beyond capacity, and the cursor moves to the new tail. Returns the
    /// number of entries dropped (discarded plus evicted).
    pub fn push(&mut self, record: ChangeRecord) -> usize {
        let keep = self.next_index();
        let discarded = self.entries.len() - keep;
        self.entries.truncate(keep);
        self.entries.push_back(record);

        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        self.position = Some(self.entries.len() - 1);
        discarded + evicted
    }

    /// Plans an undo of the entry at the cursor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NothingToUndo` when the cursor is before the
    /// first entry, or the error from [`Effect::reversal`].
    pub fn plan_undo(&self) -> Result<Step, DomainError> {
        let index = self.position.ok_or(DomainError::NothingToUndo)?;
        let record = self.entries.get(index).ok_or(DomainError::NothingToUndo)?;
        Ok(Step {
            direction: Direction::Undo,
            effect: Effect::reversal(record)?,
            record: record.clone(),
            from: self.position,
            to: index.checked_sub(1),
        })
    }

    /// Plans a redo of the entry after the cursor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NothingToRedo` when the cursor is at the last
    /// entry, or the error from [`Effect::forward`].
    pub fn plan_redo(&self) -> Result<Step, DomainError> {
        let index = self.next_index();
        let record = self.entries.get(index).ok_or(DomainError::NothingToRedo)?;
        Ok(Step {
            direction: Direction::Redo,
            effect: Effect::forward(record)?,
            record: record.clone(),
            from: self.position,
            to: Some(index),
        })
    }

    /// Moves the cursor as planned by `step`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the journal changed since the
    /// step was planned; the cursor is left untouched.
    pub fn commit(&mut self, step: &Step) -> Result<(), DomainError> {
        let target = match step.direction {
            Direction::Undo => step.from,
            Direction::Redo => step.to,
        };
        let target_matches = target
            .and_then(|index| self.entries.get(index))
            .is_some_and(|entry| entry.id == step.record.id);
        if self.position != step.from || !target_matches {
            return Err(DomainError::Validation(
                "journal changed while a step was in flight".to_owned(),
            ));
        }
        self.position = step.to;
        Ok(())
    }

    fn next_index(&self) -> usize {
        self.position.map_or(0, |position| position + 1)
    }
}
