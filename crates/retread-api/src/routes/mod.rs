//! Route modules and the assembled application router.

pub mod health;
pub mod history;
pub mod rows;

use axum::Router;

use crate::state::AppState;

/// Builds the full route tree. Middleware layers are added by the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/history", history::router())
        .nest("/api/v1/rows", rows::router())
        .with_state(state)
}
