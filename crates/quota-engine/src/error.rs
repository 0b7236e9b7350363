//! Coordinator error types.

use std::fmt;

use quota_core::CoreError;
use quota_store::StoreError;
use thiserror::Error;

/// Store call that failed during a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationStage {
    ReadLimit,
    ReadTraded,
    Commit,
    WriteLimit,
}

impl EvaluationStage {
    /// Label used in logs and the `op` metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadLimit => "get_daily_limit",
            Self::ReadTraded => "get_daily_traded",
            Self::Commit => "commit_daily_traded",
            Self::WriteLimit => "set_daily_limit",
        }
    }
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-decision outcomes of a request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before any store access.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    /// The store failed or timed out; no decision is claimed.
    #[error("Evaluation unavailable during {stage}: {source}")]
    EvaluationUnavailable {
        stage: EvaluationStage,
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::EvaluationUnavailable { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
