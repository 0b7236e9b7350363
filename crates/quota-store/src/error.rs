//! Store error types.

use thiserror::Error;

/// Failures talking to the limit store.
///
/// The coordinator treats every variant as the store being unavailable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable during {op}: {reason}")]
    Unavailable { op: &'static str, reason: String },

    #[error("Store {op} timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    #[error("Corrupt value at {key}: {value}")]
    CorruptValue { key: String, value: String },

    #[error("Amount out of range: {0}")]
    OutOfRange(String),
}

impl StoreError {
    pub fn unavailable(op: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            op,
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
