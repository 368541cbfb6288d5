//! `PostgreSQL` implementation of the `JournalStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use retread_core::change::{ChangeRecord, NewChangeRecord, OperationKind};
use retread_core::error::DomainError;
use retread_core::repository::JournalStore;
use retread_core::row::RowSnapshot;
use retread_core::table::TableName;

use crate::infrastructure;

/// Column list for `change_history` queries.
const COLUMNS: &str = "\
    id, operation_kind, table_name, record_id, \
    prior_state, new_state, description, occurred_at";

/// A raw `change_history` row.
#[derive(Debug, sqlx::FromRow)]
struct ChangeHistoryRow {
    id: Uuid,
    operation_kind: String,
    table_name: String,
    record_id: String,
    prior_state: Option<Value>,
    new_state: Option<Value>,
    description: String,
    occurred_at: DateTime<Utc>,
}

impl ChangeHistoryRow {
    /// Converts the row into a `ChangeRecord`.
    ///
    /// Returns `None` for rows naming a table this build does not know.
    /// Snapshots that no longer decode are dropped with a warning; the entry
    /// is kept so it can still be listed.
    fn into_record(self) -> Option<ChangeRecord> {
        let Ok(table) = self.table_name.parse::<TableName>() else {
            tracing::warn!(
                change_id = %self.id,
                table_name = %self.table_name,
                "skipping change for unknown table"
            );
            return None;
        };
        let prior_state = decode_snapshot(self.id, table, "prior_state", self.prior_state);
        let new_state = decode_snapshot(self.id, table, "new_state", self.new_state);
        Some(ChangeRecord {
            id: self.id,
            operation: OperationKind::from(self.operation_kind),
            table,
            record_id: self.record_id,
            prior_state,
            new_state,
            description: self.description,
            occurred_at: self.occurred_at,
        })
    }
}

fn decode_snapshot(
    change_id: Uuid,
    table: TableName,
    column: &'static str,
    value: Option<Value>,
) -> Option<RowSnapshot> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => match RowSnapshot::from_value(table, value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(%change_id, column, error = %e, "dropping undecodable snapshot");
                None
            }
        },
    }
}

/// PostgreSQL-backed journal store over the `change_history` table.
#[derive(Debug, Clone)]
pub struct PgJournalStore {
    pool: PgPool,
}

impl PgJournalStore {
    /// Creates a new `PgJournalStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JournalStore for PgJournalStore {
    async fn append(
        &self,
        record: NewChangeRecord,
        occurred_at: DateTime<Utc>,
    ) -> Result<ChangeRecord, DomainError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO change_history \
             (operation_kind, table_name, record_id, prior_state, new_state, description, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(record.operation.as_str())
        .bind(record.table.as_str())
        .bind(&record.record_id)
        .bind(record.prior_state.as_ref().map(RowSnapshot::to_value))
        .bind(record.new_state.as_ref().map(RowSnapshot::to_value))
        .bind(&record.description)
        .bind(occurred_at)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(ChangeRecord {
            id,
            operation: record.operation,
            table: record.table,
            record_id: record.record_id,
            prior_state: record.prior_state,
            new_state: record.new_state,
            description: record.description,
            occurred_at,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<ChangeRecord>, DomainError> {
        let query = format!("SELECT {COLUMNS} FROM change_history WHERE id = $1");
        let row = sqlx::query_as::<_, ChangeHistoryRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(row.and_then(ChangeHistoryRow::into_record))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChangeRecord>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        // Newest page first, then flipped so callers see oldest first. Entries
        // sharing a timestamp keep insertion order via `seq`.
        let query = format!(
            "SELECT {COLUMNS} FROM ( \
                 SELECT {COLUMNS}, seq FROM change_history \
                 ORDER BY occurred_at DESC, seq DESC \
                 LIMIT $1 \
             ) AS page \
             ORDER BY occurred_at ASC, seq ASC"
        );
        let rows = sqlx::query_as::<_, ChangeHistoryRow>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(rows
            .into_iter()
            .filter_map(ChangeHistoryRow::into_record)
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM change_history WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM change_history WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(result.rows_affected())
    }
}
