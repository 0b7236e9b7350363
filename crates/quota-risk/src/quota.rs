//! Read-only quota view.

use quota_core::{Amount, TradingDay, UserId};
use serde::Serialize;

/// A user's quota state for one trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub user_id: UserId,
    pub trading_day: TradingDay,
    pub daily_limit: Amount,
    pub daily_traded: Amount,
    /// Quota left today, never negative. A limit lowered below today's total
    /// reports zero.
    pub remaining: Amount,
}

impl QuotaSnapshot {
    pub fn new(
        user_id: UserId,
        trading_day: TradingDay,
        daily_limit: Amount,
        daily_traded: Amount,
    ) -> Self {
        Self {
            user_id,
            trading_day,
            daily_limit,
            daily_traded,
            remaining: daily_limit.saturating_sub(daily_traded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_remaining() {
        let day = TradingDay::from_ymd(2026, 4, 1).unwrap();
        let snap = QuotaSnapshot::new(
            UserId::new("dave").unwrap(),
            day,
            Amount::new(dec!(10000)),
            Amount::new(dec!(2500.75)),
        );
        assert_eq!(snap.remaining, Amount::new(dec!(7499.25)));
    }

    #[test]
    fn test_remaining_never_negative() {
        let day = TradingDay::from_ymd(2026, 4, 1).unwrap();
        let snap = QuotaSnapshot::new(
            UserId::new("dave").unwrap(),
            day,
            Amount::new(dec!(1000)),
            Amount::new(dec!(4000)),
        );
        assert_eq!(snap.remaining, Amount::ZERO);
    }
}
