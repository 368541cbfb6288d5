//! Retread: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use retread_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the schema migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Exporter or subscriber setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// The change history could not be loaded.
    #[error("history error: {0}")]
    History(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code and machine-readable code for the wrapped error.
    #[must_use]
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::RowNotFound { .. } => (StatusCode::NOT_FOUND, "row_not_found"),
            DomainError::UnknownTable(_) => (StatusCode::BAD_REQUEST, "unknown_table"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::MissingSnapshot { .. } => (StatusCode::CONFLICT, "missing_snapshot"),
            DomainError::UnsupportedOperation(_) => {
                (StatusCode::CONFLICT, "unsupported_operation")
            }
            DomainError::NothingToUndo => (StatusCode::CONFLICT, "nothing_to_undo"),
            DomainError::NothingToRedo => (StatusCode::CONFLICT, "nothing_to_redo"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.classify();

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
