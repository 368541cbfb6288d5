//! `PostgreSQL` implementation of the `RowStore` trait.
//!
//! Each business table stores the row document in a `data` JSONB column keyed
//! by `id`. Table identifiers are interpolated into SQL, so they only ever
//! come from `TableName`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use retread_core::error::DomainError;
use retread_core::repository::RowStore;
use retread_core::row::RowSnapshot;
use retread_core::table::TableName;

use crate::infrastructure;

/// PostgreSQL-backed row store.
#[derive(Debug, Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    /// Creates a new `PgRowStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn fetch(&self, table: TableName, id: &str) -> Result<Option<RowSnapshot>, DomainError> {
        let query = format!("SELECT data FROM {table} WHERE id = $1");
        let data: Option<Value> = sqlx::query_scalar(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;
        data.map(|value| RowSnapshot::from_value(table, value))
            .transpose()
    }

    async fn list(&self, table: TableName) -> Result<Vec<RowSnapshot>, DomainError> {
        let query = format!("SELECT data FROM {table} ORDER BY id");
        let rows: Vec<Value> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.into_iter()
            .map(|value| RowSnapshot::from_value(table, value))
            .collect()
    }

    async fn insert(&self, row: &RowSnapshot) -> Result<(), DomainError> {
        let table = row.table();
        let query = format!(
            "INSERT INTO {table} (id, data) VALUES ($1, $2) \
             ON CONFLICT (id) DO NOTHING"
        );
        let result = sqlx::query(&query)
            .bind(row.id())
            .bind(row.to_value())
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::Validation(format!(
                "{table}/{} already exists",
                row.id()
            )));
        }
        Ok(())
    }

    async fn update(&self, row: &RowSnapshot) -> Result<(), DomainError> {
        let table = row.table();
        let query = format!("UPDATE {table} SET data = $2, updated_at = NOW() WHERE id = $1");
        let result = sqlx::query(&query)
            .bind(row.id())
            .bind(row.to_value())
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::RowNotFound {
                table,
                id: row.id().to_owned(),
            });
        }
        Ok(())
    }

    async fn delete(&self, table: TableName, id: &str) -> Result<bool, DomainError> {
        let query = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(result.rows_affected() > 0)
    }
}
