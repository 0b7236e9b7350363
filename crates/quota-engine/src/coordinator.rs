//! Per-request quota orchestration.
//!
//! # Request Flow (Strict)
//!
//! 1. validate                 → InvalidRequest (no store access)
//! 2. resolve trading day      (UTC, once per request)
//! 3. read limit, read traded  → EvaluationUnavailable (no event)
//! 4. rules                    → approve | reject(reason)
//! 5. approved: atomic commit
//!    5a. LimitExceeded        → reject(DAILY_LIMIT_EXCEEDED)
//!    5b. store failure        → EvaluationUnavailable (UNAVAILABLE event)
//! 6. publish exactly one event (failure logged, decision unchanged)
//! 7. return
//!
//! No retries at any step. A request never spans two trading days because
//! the day is resolved once in step 2.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use quota_audit::AuditPublisher;
use quota_core::{
    Amount, CoreError, DecisionReason, RiskDecision, RiskEvent, TradeRequest, TradingDay, UserId,
};
use quota_risk::{QuotaRules, QuotaSnapshot};
use quota_store::{CommitOutcome, LimitStore, LimitStoreAdapter, StoreConfig, StoreError};
use quota_telemetry::Metrics;
use tracing::{debug, error, info, warn};

use crate::config::QuotaConfig;
use crate::error::{EngineError, EngineResult, EvaluationStage};

/// Coordinates store, rules and audit publisher for each trade.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct QuotaCoordinator {
    store: LimitStoreAdapter,
    rules: QuotaRules,
    publisher: Arc<dyn AuditPublisher>,
}

impl QuotaCoordinator {
    pub fn new(
        store: LimitStoreAdapter,
        rules: QuotaRules,
        publisher: Arc<dyn AuditPublisher>,
    ) -> Self {
        Self {
            store,
            rules,
            publisher,
        }
    }

    /// Build from configuration, validating the quota parameters.
    pub fn from_config(
        backend: Arc<dyn LimitStore>,
        store_config: &StoreConfig,
        quota_config: &QuotaConfig,
        publisher: Arc<dyn AuditPublisher>,
    ) -> EngineResult<Self> {
        quota_config.validate()?;
        let rules = QuotaRules::new(quota_config.rules_config())
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let store =
            LimitStoreAdapter::new(backend, quota_config.default_daily_limit, store_config);
        info!(
            backend = store.backend_name(),
            publisher = publisher.name(),
            default_daily_limit = %quota_config.default_daily_limit,
            large_trade_fraction = %quota_config.large_trade_fraction,
            "Quota coordinator ready"
        );
        Ok(Self::new(store, rules, publisher))
    }

    pub fn rules(&self) -> &QuotaRules {
        &self.rules
    }

    pub fn store(&self) -> &LimitStoreAdapter {
        &self.store
    }

    // ========================================================================
    // Trade evaluation
    // ========================================================================

    /// Evaluate a trade against the user's quota for the current trading day.
    pub async fn evaluate_trade(&self, request: &TradeRequest) -> EngineResult<RiskDecision> {
        self.evaluate_trade_at(request, Utc::now()).await
    }

    /// Evaluate a trade as of `now`.
    pub async fn evaluate_trade_at(
        &self,
        request: &TradeRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<RiskDecision> {
        let started = Instant::now();
        request.validate()?;

        let day = TradingDay::at(now);
        let user_id = &request.user_id;

        let limit = self
            .store
            .get_daily_limit(user_id)
            .await
            .map_err(|e| unavailable(EvaluationStage::ReadLimit, user_id, e))?;
        let traded = self
            .store
            .get_daily_traded(user_id, day)
            .await
            .map_err(|e| unavailable(EvaluationStage::ReadTraded, user_id, e))?;

        let decision = self.rules.evaluate(limit, traded, request.amount);
        debug!(
            user_id = %user_id,
            %day,
            %limit,
            %traded,
            amount = %request.amount,
            approved = decision.is_approved(),
            reason = %decision.reason(),
            "Rules evaluated"
        );

        let outcome = if decision.is_approved() {
            self.commit(request, day, limit, now).await
        } else {
            Ok(decision)
        };

        let event = match &outcome {
            Ok(decision) => RiskEvent::from_decision(request, decision, day, now),
            Err(_) => RiskEvent::unavailable(request, day, now),
        };
        self.publish(&event).await;

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        Metrics::evaluation_latency(latency_ms);
        match &outcome {
            Ok(decision) => {
                let label = if decision.is_approved() {
                    "approved"
                } else {
                    "rejected"
                };
                Metrics::decision(label, decision.reason().as_str());
                info!(
                    user_id = %user_id,
                    symbol = %request.symbol,
                    action = %request.side,
                    amount = %request.amount,
                    approved = decision.is_approved(),
                    reason = %decision.reason(),
                    latency_ms,
                    "Trade evaluated"
                );
            }
            Err(_) => Metrics::decision("unavailable", DecisionReason::None.as_str()),
        }

        outcome
    }

    /// Commit an approved amount. Only a committed counter confirms approval.
    async fn commit(
        &self,
        request: &TradeRequest,
        day: TradingDay,
        limit: Amount,
        now: DateTime<Utc>,
    ) -> EngineResult<RiskDecision> {
        let user_id = &request.user_id;
        let outcome = self
            .store
            .commit_daily_traded(user_id, day, request.amount, limit, now)
            .await
            .map_err(|e| unavailable(EvaluationStage::Commit, user_id, e))?;

        match outcome {
            CommitOutcome::Committed { new_total } => {
                debug!(user_id = %user_id, %day, %new_total, "Daily total committed");
                Ok(RiskDecision::approve())
            }
            CommitOutcome::LimitExceeded { current_total } => {
                Metrics::commit_race_lost();
                warn!(
                    user_id = %user_id,
                    %day,
                    %current_total,
                    amount = %request.amount,
                    %limit,
                    "Concurrent commit used the remaining quota, rejecting"
                );
                Ok(RiskDecision::reject(DecisionReason::DailyLimitExceeded))
            }
        }
    }

    /// Best-effort, single attempt.
    async fn publish(&self, event: &RiskEvent) {
        match self.publisher.publish(event).await {
            Ok(()) => Metrics::publish(true),
            Err(e) => {
                Metrics::publish(false);
                warn!(
                    error = %e,
                    event_id = %event.event_id,
                    user_id = %event.user_id,
                    decision = event.decision.as_str(),
                    publisher = self.publisher.name(),
                    "Risk event publish failed"
                );
            }
        }
    }

    // ========================================================================
    // Limits
    // ========================================================================

    /// Current quota state for `user_id`.
    pub async fn user_limits(&self, user_id: &UserId) -> EngineResult<QuotaSnapshot> {
        self.user_limits_at(user_id, Utc::now()).await
    }

    pub async fn user_limits_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> EngineResult<QuotaSnapshot> {
        let day = TradingDay::at(now);
        let limit = self
            .store
            .get_daily_limit(user_id)
            .await
            .map_err(|e| unavailable(EvaluationStage::ReadLimit, user_id, e))?;
        let traded = self
            .store
            .get_daily_traded(user_id, day)
            .await
            .map_err(|e| unavailable(EvaluationStage::ReadTraded, user_id, e))?;
        Ok(QuotaSnapshot::new(user_id.clone(), day, limit, traded))
    }

    /// Write a per-user limit override and return the updated view.
    ///
    /// Lowering the limit below today's total is allowed; further trades
    /// are rejected until the day rolls over.
    pub async fn set_daily_limit(
        &self,
        user_id: &UserId,
        limit: Amount,
    ) -> EngineResult<QuotaSnapshot> {
        self.set_daily_limit_at(user_id, limit, Utc::now()).await
    }

    /// The write is the last store call, so an error means the override
    /// was not stored (or, on a timeout, may not have been).
    pub async fn set_daily_limit_at(
        &self,
        user_id: &UserId,
        limit: Amount,
        now: DateTime<Utc>,
    ) -> EngineResult<QuotaSnapshot> {
        if !limit.is_positive() || limit.to_minor_units().is_none() {
            return Err(CoreError::InvalidAmount(limit.to_string()).into());
        }
        let day = TradingDay::at(now);
        let traded = self
            .store
            .get_daily_traded(user_id, day)
            .await
            .map_err(|e| unavailable(EvaluationStage::ReadTraded, user_id, e))?;
        self.store
            .set_daily_limit(user_id, limit)
            .await
            .map_err(|e| unavailable(EvaluationStage::WriteLimit, user_id, e))?;
        info!(user_id = %user_id, %limit, "Daily limit override set");
        Ok(QuotaSnapshot::new(user_id.clone(), day, limit, traded))
    }
}

fn unavailable(stage: EvaluationStage, user_id: &UserId, source: StoreError) -> EngineError {
    Metrics::store_error(stage.as_str());
    error!(user_id = %user_id, %stage, error = %source, "Limit store unavailable");
    EngineError::EvaluationUnavailable { stage, source }
}
