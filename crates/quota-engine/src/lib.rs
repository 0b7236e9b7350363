//! Quota coordinator.
//!
//! Owns the per-request flow: read the user's limit and today's total,
//! apply the quota rules, commit approved amounts through the store's atomic
//! increment-and-validate, publish one audit event, return the verdict.

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::QuotaConfig;
pub use coordinator::QuotaCoordinator;
pub use error::{EngineError, EngineResult, EvaluationStage};
