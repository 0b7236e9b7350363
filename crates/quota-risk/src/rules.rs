//! Quota decision rules.
//!
//! # Rule Evaluation Order
//! 1. daily_limit: `already_traded + amount > limit` rejects with
//!    `DAILY_LIMIT_EXCEEDED`, regardless of the large-trade rule.
//! 2. large_trade: `amount > limit * large_trade_fraction` rejects with
//!    `LARGE_TRADE_MANUAL_REVIEW`.
//! 3. Otherwise approve.
//!
//! Both comparisons are strict: a trade landing exactly on the limit, or
//! exactly on the large-trade threshold, is approved. The threshold is a
//! share of the limit, never of the remaining quota.

use crate::error::{RiskError, RiskResult};
use quota_core::{Amount, DecisionReason, RiskDecision};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRulesConfig {
    /// Share of the daily limit above which a single trade needs manual review.
    #[serde(default = "default_large_trade_fraction")]
    pub large_trade_fraction: Decimal,
}

fn default_large_trade_fraction() -> Decimal {
    Decimal::new(5, 1) // 0.5 = 50%
}

impl Default for QuotaRulesConfig {
    fn default() -> Self {
        Self {
            large_trade_fraction: default_large_trade_fraction(),
        }
    }
}

impl QuotaRulesConfig {
    /// Fraction must lie in (0, 1].
    pub fn validate(&self) -> RiskResult<()> {
        let fraction = self.large_trade_fraction;
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(RiskError::ConfigError(format!(
                "large_trade_fraction must be in (0, 1], got {fraction}"
            )));
        }
        Ok(())
    }
}

/// Deterministic quota rules.
#[derive(Debug, Clone, Default)]
pub struct QuotaRules {
    config: QuotaRulesConfig,
}

impl QuotaRules {
    /// Create rules with a validated configuration.
    pub fn new(config: QuotaRulesConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &QuotaRulesConfig {
        &self.config
    }

    /// Single-trade amount above which manual review is required.
    #[inline]
    pub fn large_trade_threshold(&self, limit: Amount) -> Amount {
        limit * self.config.large_trade_fraction
    }

    /// Caller-facing explanation of `reason` under this configuration.
    pub fn describe(&self, reason: DecisionReason) -> Option<String> {
        reason.message(self.config.large_trade_fraction)
    }

    /// Evaluate a trade against the user's limit and today's total.
    #[must_use]
    pub fn evaluate(
        &self,
        limit: Amount,
        already_traded: Amount,
        trade_amount: Amount,
    ) -> RiskDecision {
        if already_traded + trade_amount > limit {
            trace!(
                rule = "daily_limit",
                %limit,
                %already_traded,
                %trade_amount,
                "rule matched"
            );
            return RiskDecision::reject(DecisionReason::DailyLimitExceeded);
        }

        let threshold = self.large_trade_threshold(limit);
        if trade_amount > threshold {
            trace!(rule = "large_trade", %threshold, %trade_amount, "rule matched");
            return RiskDecision::reject(DecisionReason::LargeTradeManualReview);
        }

        RiskDecision::approve()
    }
}

/// Evaluate with the default 50% large-trade threshold.
#[must_use]
pub fn evaluate(limit: Amount, already_traded: Amount, trade_amount: Amount) -> RiskDecision {
    QuotaRules::default().evaluate(limit, already_traded, trade_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amt(d: Decimal) -> Amount {
        Amount::new(d)
    }

    #[test]
    fn test_reference_examples() {
        let limit = amt(dec!(10000));

        let d = evaluate(limit, amt(dec!(0)), amt(dec!(4000)));
        assert!(d.is_approved());

        let d = evaluate(limit, amt(dec!(7000)), amt(dec!(4000)));
        assert_eq!(d.reason(), DecisionReason::DailyLimitExceeded);

        let d = evaluate(limit, amt(dec!(0)), amt(dec!(6000)));
        assert_eq!(d.reason(), DecisionReason::LargeTradeManualReview);

        let d = evaluate(limit, amt(dec!(0)), amt(dec!(5000)));
        assert!(d.is_approved());
    }

    #[test]
    fn test_exact_limit_is_approved() {
        let d = evaluate(amt(dec!(10000)), amt(dec!(6000)), amt(dec!(4000)));
        assert!(d.is_approved());
    }

    #[test]
    fn test_one_minor_unit_over_limit_rejected() {
        let d = evaluate(amt(dec!(10000)), amt(dec!(6000)), amt(dec!(4000.0001)));
        assert_eq!(d.reason(), DecisionReason::DailyLimitExceeded);
    }

    #[test]
    fn test_limit_rule_wins_over_large_trade() {
        // Both rules match; the daily limit is reported
        let d = evaluate(amt(dec!(10000)), amt(dec!(5000)), amt(dec!(6000)));
        assert_eq!(d.reason(), DecisionReason::DailyLimitExceeded);
    }

    #[test]
    fn test_threshold_uses_limit_not_remaining() {
        // 3000 is well under half the limit even though it exceeds half the remainder
        let d = evaluate(amt(dec!(10000)), amt(dec!(6000)), amt(dec!(3000)));
        assert!(d.is_approved());
    }

    #[test]
    fn test_decimal_precision_near_boundary() {
        // 0.1 + 0.2 style sums must not drift
        let limit = amt(dec!(0.3));
        let d = QuotaRules::new(QuotaRulesConfig {
            large_trade_fraction: Decimal::ONE,
        })
        .unwrap()
        .evaluate(limit, amt(dec!(0.1)), amt(dec!(0.2)));
        assert!(d.is_approved());
    }

    #[test]
    fn test_pure_and_deterministic() {
        let rules = QuotaRules::default();
        let first = rules.evaluate(amt(dec!(10000)), amt(dec!(1234.5)), amt(dec!(2500)));
        for _ in 0..100 {
            assert_eq!(
                rules.evaluate(amt(dec!(10000)), amt(dec!(1234.5)), amt(dec!(2500))),
                first
            );
        }
    }

    #[test]
    fn test_rule_partition_sweep() {
        // Every (traded, amount) pair on a 250-unit grid lands in exactly the
        // region the rules describe.
        let limit = amt(dec!(10000));
        let half = dec!(5000);
        let step = dec!(250);

        let mut traded = Decimal::ZERO;
        while traded <= dec!(12000) {
            let mut amount = step;
            while amount <= dec!(12000) {
                let d = evaluate(limit, amt(traded), amt(amount));
                if traded + amount > limit.inner() {
                    assert_eq!(d.reason(), DecisionReason::DailyLimitExceeded);
                } else if amount > half {
                    assert_eq!(d.reason(), DecisionReason::LargeTradeManualReview);
                } else {
                    assert!(d.is_approved(), "traded={traded} amount={amount}");
                }
                amount += step;
            }
            traded += step;
        }
    }

    #[test]
    fn test_custom_fraction() {
        let rules = QuotaRules::new(QuotaRulesConfig {
            large_trade_fraction: dec!(0.25),
        })
        .unwrap();
        let limit = amt(dec!(10000));
        assert!(rules.evaluate(limit, Amount::ZERO, amt(dec!(2500))).is_approved());
        assert_eq!(
            rules.evaluate(limit, Amount::ZERO, amt(dec!(2501))).reason(),
            DecisionReason::LargeTradeManualReview
        );
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        for fraction in [dec!(0), dec!(-0.5), dec!(1.01)] {
            let result = QuotaRules::new(QuotaRulesConfig {
                large_trade_fraction: fraction,
            });
            assert!(result.is_err(), "fraction {fraction} should be rejected");
        }
    }

    #[test]
    fn test_config_defaults_from_toml() {
        let config: QuotaRulesConfig = toml::from_str("").unwrap();
        assert_eq!(config.large_trade_fraction, dec!(0.5));
    }
}
