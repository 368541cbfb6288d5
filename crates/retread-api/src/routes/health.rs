//! Liveness endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Crate version of the running binary.
    pub version: &'static str,
    /// Entries held by the in-memory history.
    pub history_entries: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        history_entries: state.history.stats().await.total_entries,
    })
}

/// Returns the liveness router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
