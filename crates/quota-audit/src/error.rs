//! Audit error types.

use thiserror::Error;

/// Failure handing an event to the transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Audit transport closed")]
    TransportClosed,

    #[error("Audit publish timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Audit transport rejected message: {0}")]
    Rejected(String),
}

pub type PublishResult<T> = Result<T, PublishError>;

/// Failure writing audit files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Audit buffer full ({capacity} pending), message dropped")]
    BufferFull { capacity: usize },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
