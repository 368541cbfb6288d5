//! Tunables for the change history.

/// Default number of entries kept in memory.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default number of entries rehydrated by a reload.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Default retention for the sweeper, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Tunables for a `HistoryManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum entries held in memory; oldest are evicted first.
    pub capacity: usize,
    /// Entries loaded by `load_history` when no limit is given.
    pub page_size: usize,
    /// Days kept by `clear_old_history` when no threshold is given.
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            page_size: DEFAULT_PAGE_SIZE,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}
