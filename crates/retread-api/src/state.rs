//! Shared application state.

use std::sync::Arc;

use retread_history::application::history_manager::HistoryManager;
use retread_history::application::tracked_rows::TrackedRows;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The session's change history.
    pub history: Arc<HistoryManager>,
    /// Journaled access to the business tables.
    pub rows: TrackedRows,
}

impl AppState {
    /// Create new application state around `history`.
    #[must_use]
    pub fn new(history: Arc<HistoryManager>) -> Self {
        Self {
            rows: TrackedRows::new(history.clone()),
            history,
        }
    }
}
