//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use retread_api::routes;
use retread_api::state::AppState;
use retread_history::application::history_manager::HistoryManager;
use retread_history::config::HistoryConfig;
use retread_store::pg_journal_store::PgJournalStore;
use retread_store::pg_row_store::PgRowStore;
use retread_test_support::{SteppingClock, fixed_now};
use sqlx::PgPool;
use tower::ServiceExt;

/// A history session over the real stores, with a clock the test controls.
pub struct TestSession {
    pub app: Router,
    pub history: Arc<HistoryManager>,
    pub clock: Arc<SteppingClock>,
}

/// Build the full app router over `PgJournalStore`/`PgRowStore`. Uses the
/// same route tree as `main.rs`.
pub fn build_test_app(pool: PgPool) -> TestSession {
    let clock = Arc::new(SteppingClock::new(fixed_now()));
    let history = Arc::new(HistoryManager::new(
        Arc::new(PgJournalStore::new(pool.clone())),
        Arc::new(PgRowStore::new(pool)),
        clock.clone(),
        HistoryConfig::default(),
    ));
    TestSession {
        app: routes::app(AppState::new(history.clone())),
        history,
        clock,
    }
}

/// Send a request with an optional JSON body and return the response.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send_json(app, "GET", uri, None).await
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send_json(app, "POST", uri, Some(body)).await
}
