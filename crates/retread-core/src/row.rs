//! Row schemas for the business tables and the snapshot union over them.
//!
//! Monetary amounts are stored as integer cents. Every row carries a stable
//! string `id`; the change history relies on nothing else about its shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::table::TableName;

/// A customer of the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Row identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Tax or identity document number.
    #[serde(default)]
    pub document: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Contact e-mail.
    #[serde(default)]
    pub email: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
}

/// A product or service the shop sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Row identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// List price in cents.
    pub unit_price_cents: i64,
    /// Whether the product is offered.
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A stock position (rubber, casings, finished tires).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    /// Row identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Product this stock belongs to, if any.
    #[serde(default)]
    pub product_id: Option<String>,
    /// Units on hand.
    pub quantity: i64,
    /// Reorder threshold.
    #[serde(default)]
    pub min_quantity: i64,
    /// Cost per unit in cents.
    #[serde(default)]
    pub unit_cost_cents: i64,
}

/// Direction of a cash-flow entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowKind {
    /// Money in.
    Income,
    /// Money out.
    Expense,
}

/// An income or expense line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowEntry {
    /// Row identifier.
    pub id: String,
    /// Income or expense.
    pub kind: CashFlowKind,
    /// Amount in cents, always positive.
    pub amount_cents: i64,
    /// What the money was for.
    pub description: String,
    /// Optional reporting category.
    #[serde(default)]
    pub category: Option<String>,
    /// Business date of the entry.
    pub occurred_on: NaiveDate,
}

/// Lifecycle of a recapping job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    /// Casing received, not started.
    Pending,
    /// On the shop floor.
    InProgress,
    /// Recapped and inspected.
    Completed,
    /// Handed back to the client.
    Delivered,
    /// Rejected casing or cancelled job.
    Cancelled,
}

/// A recapping job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrder {
    /// Row identifier.
    pub id: String,
    /// Owning client, if any.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Tire size, e.g. `295/80R22.5`.
    pub tire_size: String,
    /// Tread pattern applied.
    #[serde(default)]
    pub tread_pattern: Option<String>,
    /// Number of tires in the job.
    pub quantity: i64,
    /// Current status.
    pub status: ProductionStatus,
}

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Row identifier.
    pub id: String,
    /// Buying client, if known.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Sale total in cents.
    pub total_cents: i64,
    /// Cost of goods sold in cents, used for profit tracking.
    #[serde(default)]
    pub cost_cents: i64,
    /// Business date of the sale.
    pub sold_on: NaiveDate,
}

fn default_true() -> bool {
    true
}

/// A full row from one of the known business tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum RowSnapshot {
    /// A `clients` row.
    Clients(Client),
    /// A `products` row.
    Products(Product),
    /// A `stock_items` row.
    StockItems(StockItem),
    /// A `cash_flow` row.
    CashFlow(CashFlowEntry),
    /// A `production_orders` row.
    ProductionOrders(ProductionOrder),
    /// A `sales` row.
    Sales(Sale),
}

impl RowSnapshot {
    /// The table the row belongs to.
    #[must_use]
    pub fn table(&self) -> TableName {
        match self {
            RowSnapshot::Clients(_) => TableName::Clients,
            RowSnapshot::Products(_) => TableName::Products,
            RowSnapshot::StockItems(_) => TableName::StockItems,
            RowSnapshot::CashFlow(_) => TableName::CashFlow,
            RowSnapshot::ProductionOrders(_) => TableName::ProductionOrders,
            RowSnapshot::Sales(_) => TableName::Sales,
        }
    }

    /// The row's stable identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            RowSnapshot::Clients(row) => &row.id,
            RowSnapshot::Products(row) => &row.id,
            RowSnapshot::StockItems(row) => &row.id,
            RowSnapshot::CashFlow(row) => &row.id,
            RowSnapshot::ProductionOrders(row) => &row.id,
            RowSnapshot::Sales(row) => &row.id,
        }
    }

    /// The row's natural display label, when its schema has one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            RowSnapshot::Clients(row) => Some(row.name.as_str()),
            RowSnapshot::Products(row) => Some(row.name.as_str()),
            RowSnapshot::StockItems(row) => Some(row.name.as_str()),
            RowSnapshot::CashFlow(row) => Some(row.description.as_str()),
            RowSnapshot::ProductionOrders(row) => Some(row.tire_size.as_str()),
            RowSnapshot::Sales(row) => row.description.as_deref(),
        }
        .filter(|label| !label.trim().is_empty())
    }

    /// Decodes an untagged row belonging to `table`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the value does not match the
    /// table's schema or carries an empty `id`.
    pub fn from_value(table: TableName, value: serde_json::Value) -> Result<Self, DomainError> {
        fn decode<T: serde::de::DeserializeOwned>(
            table: TableName,
            value: serde_json::Value,
        ) -> Result<T, DomainError> {
            serde_json::from_value(value)
                .map_err(|e| DomainError::Validation(format!("malformed {table} row: {e}")))
        }

        let snapshot = match table {
            TableName::Clients => RowSnapshot::Clients(decode(table, value)?),
            TableName::Products => RowSnapshot::Products(decode(table, value)?),
            TableName::StockItems => RowSnapshot::StockItems(decode(table, value)?),
            TableName::CashFlow => RowSnapshot::CashFlow(decode(table, value)?),
            TableName::ProductionOrders => RowSnapshot::ProductionOrders(decode(table, value)?),
            TableName::Sales => RowSnapshot::Sales(decode(table, value)?),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Encodes the row without its table tag, as stored in the row tables.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        let result = match self {
            RowSnapshot::Clients(row) => serde_json::to_value(row),
            RowSnapshot::Products(row) => serde_json::to_value(row),
            RowSnapshot::StockItems(row) => serde_json::to_value(row),
            RowSnapshot::CashFlow(row) => serde_json::to_value(row),
            RowSnapshot::ProductionOrders(row) => serde_json::to_value(row),
            RowSnapshot::Sales(row) => serde_json::to_value(row),
        };
        result.unwrap_or(serde_json::Value::Null)
    }

    /// Checks the invariants shared by every schema.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty `id` or a negative
    /// cash-flow amount.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id().trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "{} row has an empty id",
                self.table()
            )));
        }
        if let RowSnapshot::CashFlow(entry) = self {
            if entry.amount_cents < 0 {
                return Err(DomainError::Validation(format!(
                    "cash flow entry {} has a negative amount",
                    entry.id
                )));
            }
        }
        Ok(())
    }
}
