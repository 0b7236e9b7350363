//! Limit store adapter.
//!
//! Wraps a `LimitStore` backend with:
//! - the system default limit for users without an override
//! - counter TTLs derived from the end of the trading day
//! - a timeout on every call, reported as `StoreError::Timeout`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quota_core::{Amount, TradingDay, UserId};
use tracing::{debug, warn};

use crate::backend::{CommitOutcome, LimitStore};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Store access used by the quota coordinator.
#[derive(Clone)]
pub struct LimitStoreAdapter {
    store: Arc<dyn LimitStore>,
    default_daily_limit: Amount,
    timeout: Duration,
    ttl_grace: Duration,
}

impl LimitStoreAdapter {
    pub fn new(store: Arc<dyn LimitStore>, default_daily_limit: Amount, config: &StoreConfig) -> Self {
        Self {
            store,
            default_daily_limit,
            timeout: config.timeout(),
            ttl_grace: config.ttl_grace(),
        }
    }

    pub fn default_daily_limit(&self) -> Amount {
        self.default_daily_limit
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// The user's limit override, or the system default.
    pub async fn get_daily_limit(&self, user_id: &UserId) -> StoreResult<Amount> {
        let limit = self
            .bounded("get_daily_limit", self.store.get_limit_override(user_id))
            .await?;
        Ok(limit.unwrap_or(self.default_daily_limit))
    }

    /// Total already traded on `day`, zero if nothing is recorded.
    pub async fn get_daily_traded(&self, user_id: &UserId, day: TradingDay) -> StoreResult<Amount> {
        self.bounded("get_daily_traded", self.store.get_traded(user_id, day))
            .await
    }

    /// Atomically add `amount` to the day's total if it stays within `limit`.
    ///
    /// The counter expires `ttl_grace` after the trading day ends.
    ///
    /// A `Timeout` here is indeterminate: a remote backend may have applied
    /// the increment after the deadline. The caller sees a failure while the
    /// quota is consumed, never the reverse.
    pub async fn commit_daily_traded(
        &self,
        user_id: &UserId,
        day: TradingDay,
        amount: Amount,
        limit: Amount,
        now: DateTime<Utc>,
    ) -> StoreResult<CommitOutcome> {
        let ttl = self.counter_ttl(day, now);
        let outcome = self
            .bounded(
                "commit_daily_traded",
                self.store.increment_traded(user_id, day, amount, limit, ttl),
            )
            .await?;
        debug!(
            user_id = %user_id,
            %day,
            %amount,
            ttl_secs = ttl.as_secs(),
            ?outcome,
            "Counter commit"
        );
        Ok(outcome)
    }

    /// Write a per-user limit override.
    pub async fn set_daily_limit(&self, user_id: &UserId, limit: Amount) -> StoreResult<()> {
        if !limit.is_positive() || limit.to_minor_units().is_none() {
            return Err(StoreError::OutOfRange(limit.to_string()));
        }
        self.bounded("set_daily_limit", self.store.set_limit_override(user_id, limit))
            .await
    }

    /// TTL that outlives the trading day by `ttl_grace`.
    pub fn counter_ttl(&self, day: TradingDay, now: DateTime<Utc>) -> Duration {
        Duration::from_secs(day.seconds_remaining(now)) + self.ttl_grace
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(op, timeout_ms, "Limit store call timed out");
                Err(StoreError::Timeout { op, timeout_ms })
            }
        }
    }
}
