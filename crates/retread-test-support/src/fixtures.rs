//! Row fixtures shared by test suites.

use chrono::{DateTime, TimeZone, Utc};
use retread_core::row::{Client, RowSnapshot, StockItem};

/// Fixed timestamp used across test suites.
///
/// # Panics
///
/// Never in practice; the date is a valid constant.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A `clients` row with only a name set.
#[must_use]
pub fn client(id: &str, name: &str) -> RowSnapshot {
    RowSnapshot::Clients(Client {
        id: id.to_owned(),
        name: name.to_owned(),
        document: None,
        phone: None,
        email: None,
        address: None,
    })
}

/// A `stock_items` row with the given quantity on hand.
#[must_use]
pub fn stock_item(id: &str, name: &str, quantity: i64) -> RowSnapshot {
    RowSnapshot::StockItems(StockItem {
        id: id.to_owned(),
        name: name.to_owned(),
        product_id: None,
        quantity,
        min_quantity: 0,
        unit_cost_cents: 0,
    })
}
