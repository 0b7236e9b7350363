//! Error types for quota-core.

use thiserror::Error;

/// Core error types.
///
/// Every variant is a request validation failure and maps to `400` at the
/// HTTP boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
