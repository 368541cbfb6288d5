//! Shared test doubles and utilities for the Retread change history.

mod clock;
mod fixtures;
mod journal;
mod rows;

pub use clock::{FixedClock, SteppingClock};
pub use fixtures::{client, fixed_now, stock_item};
pub use journal::{FailingJournalStore, InMemoryJournalStore};
pub use rows::{FailingRowStore, InMemoryRowStore};
