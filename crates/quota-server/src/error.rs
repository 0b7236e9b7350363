//! Application and HTTP error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use quota_engine::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] quota_store::StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Audit error: {0}")]
    Audit(#[from] quota_audit::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] quota_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Error returned by an HTTP handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or invalid input (400).
    #[error("{0}")]
    BadRequest(String),

    /// The limit store could not be reached (500).
    #[error("Evaluation unavailable")]
    Unavailable,

    #[error("Internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidRequest(e) => Self::BadRequest(e.to_string()),
            EngineError::EvaluationUnavailable { .. } => Self::Unavailable,
            EngineError::Config(_) => Self::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
