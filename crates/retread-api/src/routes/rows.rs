//! Routes for journaled access to the business tables.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use retread_core::change::ChangeRecord;
use retread_core::error::DomainError;
use retread_core::row::RowSnapshot;
use retread_core::table::TableName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{table} and PUT /{table}/{id}.
#[derive(Debug, Deserialize)]
pub struct RowRequest {
    /// The row document, without its table tag.
    pub row: Value,
    /// Journal description; composed from the row when absent.
    pub description: Option<String>,
}

/// Query string for DELETE /{table}/{id}.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    /// Journal description; composed from the row when absent.
    pub description: Option<String>,
}

/// Response body for a journaled mutation.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    /// The row as stored, absent after a delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<Value>,
    /// The journal entry recorded for the mutation.
    pub change: ChangeRecord,
}

/// Response body for GET /{table}.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// The listed table.
    pub table: TableName,
    /// Every row in the table.
    pub rows: Vec<Value>,
}

/// GET /{table}
#[instrument(skip(state))]
async fn list_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<ListResponse>, ApiError> {
    let table: TableName = table.parse()?;
    let rows = state.rows.list(table).await?;
    Ok(Json(ListResponse {
        table,
        rows: rows.iter().map(RowSnapshot::to_value).collect(),
    }))
}

/// GET /{table}/{id}
#[instrument(skip(state))]
async fn get_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let table: TableName = table.parse()?;
    let row = state
        .rows
        .get(table, &id)
        .await?
        .ok_or_else(|| DomainError::RowNotFound {
            table,
            id: id.clone(),
        })?;
    Ok(Json(row.to_value()))
}

/// POST /{table}
#[instrument(skip(state, request))]
async fn create_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(request): Json<RowRequest>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let table: TableName = table.parse()?;
    let row = RowSnapshot::from_value(table, request.row)?;
    let stored = row.to_value();

    let change = state.rows.create(row, request.description).await?;
    info!(%table, record_id = %change.record_id, change_id = %change.id, "row created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            row: Some(stored),
            change,
        }),
    ))
}

/// PUT /{table}/{id}
#[instrument(skip(state, request))]
async fn update_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    Json(request): Json<RowRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let table: TableName = table.parse()?;
    let row = RowSnapshot::from_value(table, with_path_id(request.row, &id)?)?;
    let stored = row.to_value();

    let change = state.rows.update(row, request.description).await?;
    info!(%table, record_id = %change.record_id, change_id = %change.id, "row updated");

    Ok(Json(MutationResponse {
        row: Some(stored),
        change,
    }))
}

/// DELETE /{table}/{id}
#[instrument(skip(state))]
async fn delete_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<MutationResponse>, ApiError> {
    let table: TableName = table.parse()?;

    let change = state.rows.delete(table, &id, params.description).await?;
    info!(%table, record_id = %change.record_id, change_id = %change.id, "row deleted");

    Ok(Json(MutationResponse { row: None, change }))
}

/// Fills in the row's `id` from the path, rejecting a body that names a
/// different row.
fn with_path_id(mut row: Value, id: &str) -> Result<Value, DomainError> {
    let Some(fields) = row.as_object_mut() else {
        return Err(DomainError::Validation("row must be a JSON object".to_owned()));
    };
    match fields.get("id").and_then(Value::as_str) {
        Some(body_id) if body_id != id => Err(DomainError::Validation(format!(
            "row id {body_id:?} does not match path id {id:?}"
        ))),
        _ => {
            fields.insert("id".to_owned(), Value::String(id.to_owned()));
            Ok(row)
        }
    }
}

/// Returns the router for the business tables.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{table}", get(list_rows).post(create_row))
        .route(
            "/{table}/{id}",
            get(get_row).put(update_row).delete(delete_row),
        )
}
