//! Store key layout.

use quota_core::{TradingDay, UserId};

/// Key holding a user's daily limit override.
pub fn daily_limit_key(user_id: &UserId) -> String {
    format!("user:{}:daily_limit", user_id)
}

/// Key holding a user's traded total for one trading day.
pub fn traded_key(user_id: &UserId, day: TradingDay) -> String {
    format!("user:{}:traded:{}", user_id, day.key())
}
