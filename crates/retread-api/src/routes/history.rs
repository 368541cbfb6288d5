//! Routes for the change history: listing, undo/redo, reload and retention.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use retread_core::change::ChangeRecord;
use retread_core::error::DomainError;
use retread_history::application::query_handlers::{HistoryEntryView, HistoryStats};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for the undo and redo endpoints.
///
/// Failures are reported in the body with `success: false`; the request
/// itself still succeeds.
#[derive(Debug, Serialize)]
pub struct StepResponse {
    /// Whether the row change was applied.
    pub success: bool,
    /// The entry that was reversed or replayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ChangeRecord>,
    /// Machine-readable failure code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether another undo is possible afterwards.
    pub can_undo: bool,
    /// Whether another redo is possible afterwards.
    pub can_redo: bool,
}

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Index of the last applied entry, `-1` when none.
    pub current_position: i64,
    /// In-memory entries, oldest first.
    pub entries: Vec<HistoryEntryView>,
}

/// Query string for POST /reload.
#[derive(Debug, Deserialize)]
pub struct ReloadParams {
    /// Number of entries to load; the configured page size when absent.
    pub limit: Option<usize>,
}

/// Response body for POST /reload.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// Number of entries now held in memory.
    pub loaded: usize,
}

/// Query string for DELETE /.
#[derive(Debug, Deserialize)]
pub struct ClearParams {
    /// Entries newer than this many days are kept; the configured retention
    /// when absent.
    pub days_to_keep: Option<u32>,
}

/// Response body for DELETE /.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Durable entries removed.
    pub removed: u64,
    /// Retention that was applied.
    pub days_to_keep: u32,
}

/// GET /
#[instrument(skip(state))]
async fn list_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let entries = state.history.entries().await;
    Json(HistoryResponse {
        current_position: state.history.current_position().await,
        entries,
    })
}

/// GET /stats
#[instrument(skip(state))]
async fn history_stats(State(state): State<AppState>) -> Json<HistoryStats> {
    Json(state.history.stats().await)
}

/// POST /undo
#[instrument(skip(state))]
async fn undo(State(state): State<AppState>) -> Json<StepResponse> {
    let outcome = state.history.undo().await;
    Json(step_response(&state, outcome).await)
}

/// POST /redo
#[instrument(skip(state))]
async fn redo(State(state): State<AppState>) -> Json<StepResponse> {
    let outcome = state.history.redo().await;
    Json(step_response(&state, outcome).await)
}

async fn step_response(
    state: &AppState,
    outcome: Result<ChangeRecord, DomainError>,
) -> StepResponse {
    let (record, error, message) = match outcome {
        Ok(record) => (Some(record), None, None),
        Err(e) => {
            let error = ApiError(e);
            let (_, code) = error.classify();
            (None, Some(code), Some(error.0.to_string()))
        }
    };
    StepResponse {
        success: record.is_some(),
        record,
        error,
        message,
        can_undo: state.history.can_undo().await,
        can_redo: state.history.can_redo().await,
    }
}

/// POST /reload
#[instrument(skip(state))]
async fn reload(
    State(state): State<AppState>,
    Query(params): Query<ReloadParams>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let loaded = state.history.load_history(params.limit).await?;
    Ok(Json(ReloadResponse { loaded }))
}

/// DELETE /
#[instrument(skip(state))]
async fn clear_old_history(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Json<ClearResponse> {
    let days_to_keep = params
        .days_to_keep
        .unwrap_or(state.history.config().retention_days);
    let removed = state.history.clear_old_history(Some(days_to_keep)).await;
    info!(removed, days_to_keep, "retention sweep requested");
    Json(ClearResponse {
        removed,
        days_to_keep,
    })
}

/// Returns the router for the change history.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_history).delete(clear_old_history))
        .route("/stats", get(history_stats))
        .route("/undo", post(undo))
        .route("/redo", post(redo))
        .route("/reload", post(reload))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use retread_core::change::NewChangeRecord;
    use retread_history::application::history_manager::HistoryManager;
    use retread_history::config::HistoryConfig;
    use retread_test_support::{
        FailingJournalStore, FixedClock, InMemoryJournalStore, InMemoryRowStore, client, fixed_now,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_state_with(rows: InMemoryRowStore) -> AppState {
        AppState::new(Arc::new(HistoryManager::new(
            Arc::new(InMemoryJournalStore::new()),
            Arc::new(rows),
            Arc::new(FixedClock(fixed_now())),
            HistoryConfig::default(),
        )))
    }

    async fn send(state: AppState, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = router().with_state(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_undo_with_empty_history_reports_failure_with_200() {
        // Arrange
        let state = app_state_with(InMemoryRowStore::new());

        // Act
        let (status, json) = send(state, "POST", "/undo").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "nothing_to_undo");
        assert_eq!(json["can_undo"], false);
        assert!(json.get("record").is_none());
    }

    #[tokio::test]
    async fn test_undo_then_redo_reports_record_and_flags() {
        // Arrange
        let state = app_state_with(InMemoryRowStore::with_rows([client("c1", "Acme")]));
        state
            .history
            .record(NewChangeRecord::create(client("c1", "Acme"), "Created client"))
            .await
            .unwrap();

        // Act
        let (status, json) = send(state.clone(), "POST", "/undo").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["record"]["record_id"], "c1");
        assert_eq!(json["record"]["operation"], "CREATE");
        assert_eq!(json["can_undo"], false);
        assert_eq!(json["can_redo"], true);

        // Act
        let (_, json) = send(state, "POST", "/redo").await;

        // Assert
        assert_eq!(json["success"], true);
        assert_eq!(json["can_undo"], true);
        assert_eq!(json["can_redo"], false);
    }

    #[tokio::test]
    async fn test_list_history_flags_applied_entries() {
        // Arrange
        let state = app_state_with(InMemoryRowStore::new());
        state
            .history
            .record(NewChangeRecord::create(client("c1", "Acme"), "Created client"))
            .await
            .unwrap();

        // Act
        let (status, json) = send(state, "GET", "/").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["current_position"], 0);
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["applied"], true);
        assert_eq!(entries[0]["table"], "clients");
    }

    #[tokio::test]
    async fn test_stats_returns_counts() {
        let state = app_state_with(InMemoryRowStore::new());
        state
            .history
            .record(NewChangeRecord::create(client("c1", "Acme"), "Created client"))
            .await
            .unwrap();

        let (status, json) = send(state, "GET", "/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_entries"], 1);
        assert_eq!(json["creates"], 1);
        assert_eq!(json["by_table"]["clients"], 1);
    }

    #[tokio::test]
    async fn test_clear_defaults_to_configured_retention() {
        let state = app_state_with(InMemoryRowStore::new());

        let (status, json) = send(state, "DELETE", "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed"], 0);
        assert_eq!(json["days_to_keep"], 30);
    }

    #[tokio::test]
    async fn test_reload_failure_returns_500() {
        // Arrange
        let state = AppState::new(Arc::new(HistoryManager::new(
            Arc::new(FailingJournalStore),
            Arc::new(InMemoryRowStore::new()),
            Arc::new(FixedClock(fixed_now())),
            HistoryConfig::default(),
        )));

        // Act
        let (status, json) = send(state, "POST", "/reload?limit=5").await;

        // Assert
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }
}
