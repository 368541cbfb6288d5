//! Business tables whose rows the change history can journal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A logical collection the application mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    /// Customers of the recapping shop.
    Clients,
    /// Sellable products and services.
    Products,
    /// Raw material and finished-goods stock.
    StockItems,
    /// Income and expense entries.
    CashFlow,
    /// Recapping jobs on the shop floor.
    ProductionOrders,
    /// Completed sales.
    Sales,
}

impl TableName {
    /// Every known table, in declaration order.
    pub const ALL: [TableName; 6] = [
        TableName::Clients,
        TableName::Products,
        TableName::StockItems,
        TableName::CashFlow,
        TableName::ProductionOrders,
        TableName::Sales,
    ];

    /// The storage name of the table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Clients => "clients",
            TableName::Products => "products",
            TableName::StockItems => "stock_items",
            TableName::CashFlow => "cash_flow",
            TableName::ProductionOrders => "production_orders",
            TableName::Sales => "sales",
        }
    }

    /// Singular noun used in human-readable descriptions.
    #[must_use]
    pub fn singular(self) -> &'static str {
        match self {
            TableName::Clients => "client",
            TableName::Products => "product",
            TableName::StockItems => "stock item",
            TableName::CashFlow => "cash flow entry",
            TableName::ProductionOrders => "production order",
            TableName::Sales => "sale",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| DomainError::UnknownTable(s.to_owned()))
    }
}
