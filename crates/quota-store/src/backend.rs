//! Limit store backend trait.
//!
//! Abstracts the key-value store so the coordinator can run against Redis in
//! production and an in-memory map in tests and local runs.

use std::time::Duration;

pub use quota_core::BoxFuture;
use quota_core::{Amount, TradingDay, UserId};

use crate::error::StoreResult;

/// Result of an atomic increment-and-validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Counter incremented; holds the new day total.
    Committed { new_total: Amount },
    /// Increment would have pushed the total above the ceiling. Nothing was
    /// written; holds the total observed at commit time.
    LimitExceeded { current_total: Amount },
}

impl CommitOutcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Backend primitives for limits and daily counters.
///
/// Counters are only ever changed through `increment_traded`, which must be
/// atomic with respect to every other call on the same key.
pub trait LimitStore: Send + Sync {
    /// Per-user limit override, `None` if unset.
    fn get_limit_override<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, StoreResult<Option<Amount>>>;

    /// Write a per-user limit override.
    fn set_limit_override<'a>(
        &'a self,
        user_id: &'a UserId,
        limit: Amount,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Day total, zero if the key is absent or expired.
    fn get_traded<'a>(
        &'a self,
        user_id: &'a UserId,
        day: TradingDay,
    ) -> BoxFuture<'a, StoreResult<Amount>>;

    /// Add `amount` to the day total only if the result stays `<= ceiling`,
    /// and (re)arm the key's expiry to `ttl`.
    fn increment_traded<'a>(
        &'a self,
        user_id: &'a UserId,
        day: TradingDay,
        amount: Amount,
        ceiling: Amount,
        ttl: Duration,
    ) -> BoxFuture<'a, StoreResult<CommitOutcome>>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}
