//! Risk decision returned to callers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// Approved; no reason.
    #[default]
    None,
    /// Trade would push the day's total above the user's limit.
    DailyLimitExceeded,
    /// Trade alone exceeds the large-trade share of the limit.
    LargeTradeManualReview,
}

impl DecisionReason {
    /// Reason code as it appears on the wire and in metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            Self::LargeTradeManualReview => "LARGE_TRADE_MANUAL_REVIEW",
        }
    }

    /// Human readable explanation for callers.
    ///
    /// `large_trade_fraction` is the configured share of the limit, quoted
    /// as a percentage in the large-trade message.
    pub fn message(&self, large_trade_fraction: Decimal) -> Option<String> {
        match self {
            Self::None => None,
            Self::DailyLimitExceeded => Some("Daily trading limit exceeded".to_string()),
            Self::LargeTradeManualReview => {
                let percent = (large_trade_fraction * Decimal::ONE_HUNDRED).normalize();
                Some(format!(
                    "Trade amount exceeds {percent}% of daily limit, requires manual approval"
                ))
            }
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approve/reject verdict.
///
/// Constructed only through `approve` and `reject`, so an approval never
/// carries a reason and a rejection always does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RiskDecision {
    approved: bool,
    reason: DecisionReason,
}

impl RiskDecision {
    #[must_use]
    pub fn approve() -> Self {
        Self {
            approved: true,
            reason: DecisionReason::None,
        }
    }

    /// Reject with a reason.
    ///
    /// # Panics
    /// Debug builds panic if `reason` is `DecisionReason::None`.
    #[must_use]
    pub fn reject(reason: DecisionReason) -> Self {
        debug_assert!(!reason.is_none(), "rejection requires a reason");
        Self {
            approved: false,
            reason,
        }
    }

    #[inline]
    pub fn is_approved(&self) -> bool {
        self.approved
    }

    #[inline]
    pub fn reason(&self) -> DecisionReason {
        self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_has_no_reason() {
        let decision = RiskDecision::approve();
        assert!(decision.is_approved());
        assert!(decision.reason().is_none());
        assert_eq!(decision.reason().message(Decimal::new(5, 1)), None);
    }

    #[test]
    fn test_reject_keeps_reason() {
        let decision = RiskDecision::reject(DecisionReason::DailyLimitExceeded);
        assert!(!decision.is_approved());
        assert_eq!(decision.reason().as_str(), "DAILY_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_large_trade_message_quotes_configured_share() {
        let reason = DecisionReason::LargeTradeManualReview;
        assert_eq!(
            reason.message(Decimal::new(5, 1)).unwrap(),
            "Trade amount exceeds 50% of daily limit, requires manual approval"
        );
        assert_eq!(
            reason.message(Decimal::new(25, 2)).unwrap(),
            "Trade amount exceeds 25% of daily limit, requires manual approval"
        );
        assert_eq!(
            DecisionReason::DailyLimitExceeded
                .message(Decimal::new(25, 2))
                .unwrap(),
            "Daily trading limit exceeded"
        );
    }

    #[test]
    fn test_reason_serde_codes() {
        let json = serde_json::to_string(&DecisionReason::LargeTradeManualReview).unwrap();
        assert_eq!(json, "\"LARGE_TRADE_MANUAL_REVIEW\"");
        let parsed: DecisionReason = serde_json::from_str("\"NONE\"").unwrap();
        assert_eq!(parsed, DecisionReason::None);
    }
}
