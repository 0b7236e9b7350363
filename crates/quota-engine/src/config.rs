//! Quota configuration.

use quota_core::Amount;
use quota_risk::QuotaRulesConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Quota parameters (`[quota]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Limit applied to users without an override.
    #[serde(default = "default_daily_limit")]
    pub default_daily_limit: Amount,
    /// Share of the limit above which a single trade needs manual review.
    #[serde(default = "default_large_trade_fraction")]
    pub large_trade_fraction: Decimal,
}

fn default_daily_limit() -> Amount {
    Amount::from(10_000u32)
}

fn default_large_trade_fraction() -> Decimal {
    QuotaRulesConfig::default().large_trade_fraction
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_daily_limit: default_daily_limit(),
            large_trade_fraction: default_large_trade_fraction(),
        }
    }
}

impl QuotaConfig {
    pub fn rules_config(&self) -> QuotaRulesConfig {
        QuotaRulesConfig {
            large_trade_fraction: self.large_trade_fraction,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let limit = self.default_daily_limit;
        if !limit.is_positive() || limit.to_minor_units().is_none() {
            return Err(EngineError::Config(format!(
                "default_daily_limit must be positive with at most 4 decimal places, got {limit}"
            )));
        }
        self.rules_config()
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}
