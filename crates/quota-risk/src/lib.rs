//! Daily quota decision rules.
//!
//! Pure decision logic, no I/O. Rules are evaluated in order and the first
//! match wins:
//! - DailyLimitExceeded: already traded + amount > limit
//! - LargeTradeManualReview: amount > limit * large_trade_fraction
//! - otherwise approve
//!
//! Also provides `QuotaSnapshot`, the read-only view served by the limits
//! query.

pub mod error;
pub mod quota;
pub mod rules;

pub use error::{RiskError, RiskResult};
pub use quota::QuotaSnapshot;
pub use rules::{evaluate, QuotaRules, QuotaRulesConfig};
