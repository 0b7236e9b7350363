//! Audit record emitted for every decision.

use crate::decimal::{Amount, Price};
use crate::decision::{DecisionReason, RiskDecision};
use crate::trade::{TradeRequest, TradeSide, UserId};
use crate::trading_day::TradingDay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDecision {
    Approved,
    Rejected,
    /// Approved by the rules but the counter commit failed; the caller
    /// received an error and the trade must not proceed.
    Unavailable,
}

impl EventDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Immutable audit record for one evaluated trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEvent {
    /// Unique id so consumers can drop redelivered duplicates.
    pub event_id: Uuid,
    pub user_id: UserId,
    pub symbol: String,
    pub action: TradeSide,
    pub amount: Amount,
    pub price: Price,
    pub decision: EventDecision,
    pub reason: DecisionReason,
    pub trading_day: TradingDay,
    /// Unix seconds.
    pub evaluated_at: i64,
    /// Unix milliseconds.
    pub evaluated_at_ms: i64,
}

impl RiskEvent {
    /// Record a final decision.
    pub fn from_decision(
        request: &TradeRequest,
        decision: &RiskDecision,
        trading_day: TradingDay,
        now: DateTime<Utc>,
    ) -> Self {
        let outcome = if decision.is_approved() {
            EventDecision::Approved
        } else {
            EventDecision::Rejected
        };
        Self::build(request, outcome, decision.reason(), trading_day, now)
    }

    /// Record an approval that could not be committed.
    pub fn unavailable(request: &TradeRequest, trading_day: TradingDay, now: DateTime<Utc>) -> Self {
        Self::build(
            request,
            EventDecision::Unavailable,
            DecisionReason::None,
            trading_day,
            now,
        )
    }

    fn build(
        request: &TradeRequest,
        decision: EventDecision,
        reason: DecisionReason,
        trading_day: TradingDay,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            symbol: request.symbol.clone(),
            action: request.side,
            amount: request.amount,
            price: request.price,
            decision,
            reason,
            trading_day,
            evaluated_at: now.timestamp(),
            evaluated_at_ms: now.timestamp_millis(),
        }
    }

    /// Ordering key for the audit transport.
    pub fn partition_key(&self) -> &str {
        self.user_id.as_str()
    }
}
