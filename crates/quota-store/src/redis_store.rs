//! Redis limit store.
//!
//! Limit overrides are plain decimal strings so operators can set them with
//! `SET user:{id}:daily_limit 25000`. Day totals are integers in minor units
//! (`amount * 10^4`), which lets the commit script compare and increment
//! without floating-point rounding inside Lua.

use std::time::Duration;

use quota_core::{Amount, TradingDay, UserId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{info, trace};

use crate::backend::{BoxFuture, CommitOutcome, LimitStore};
use crate::error::{StoreError, StoreResult};
use crate::keys::{daily_limit_key, traded_key};

/// Atomic increment-and-validate.
///
/// KEYS[1] = counter key; ARGV = delta, ceiling (both minor units), ttl secs.
/// Returns {1, new_total} when committed, {0, current_total} when the
/// increment would exceed the ceiling (nothing written).
const COMMIT_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local delta = tonumber(ARGV[1])
local ceiling = tonumber(ARGV[2])
if current + delta > ceiling then
  return {0, current}
end
local total = redis.call('INCRBY', KEYS[1], delta)
redis.call('EXPIRE', KEYS[1], ARGV[3])
return {1, total}
"#;

/// Redis-backed limit store.
///
/// `ConnectionManager` multiplexes one connection and reconnects on failure;
/// clones share it.
#[derive(Clone)]
pub struct RedisLimitStore {
    conn: ConnectionManager,
    commit_script: Script,
}

impl RedisLimitStore {
    /// Connect to the server at `url`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::unavailable("connect", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::unavailable("connect", e))?;
        info!(url = %url, "Connected to Redis limit store");
        Ok(Self {
            conn,
            commit_script: Script::new(COMMIT_SCRIPT),
        })
    }
}

fn to_minor_units(amount: Amount) -> StoreResult<i64> {
    amount
        .to_minor_units()
        .ok_or_else(|| StoreError::OutOfRange(amount.to_string()))
}

impl LimitStore for RedisLimitStore {
    fn get_limit_override<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, StoreResult<Option<Amount>>> {
        Box::pin(async move {
            let key = daily_limit_key(user_id);
            let mut conn = self.conn.clone();
            let raw: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| StoreError::unavailable("get_limit_override", e))?;

            raw.map(|value| {
                value
                    .trim()
                    .parse::<Amount>()
                    .map_err(|_| StoreError::CorruptValue {
                        key: key.clone(),
                        value,
                    })
            })
            .transpose()
        })
    }

    fn set_limit_override<'a>(
        &'a self,
        user_id: &'a UserId,
        limit: Amount,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let key = daily_limit_key(user_id);
            let mut conn = self.conn.clone();
            let _: () = conn
                .set(&key, limit.to_string())
                .await
                .map_err(|e| StoreError::unavailable("set_limit_override", e))?;
            Ok(())
        })
    }

    fn get_traded<'a>(
        &'a self,
        user_id: &'a UserId,
        day: TradingDay,
    ) -> BoxFuture<'a, StoreResult<Amount>> {
        Box::pin(async move {
            let key = traded_key(user_id, day);
            let mut conn = self.conn.clone();
            let raw: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| StoreError::unavailable("get_traded", e))?;

            match raw {
                None => Ok(Amount::ZERO),
                Some(value) => value
                    .trim()
                    .parse::<i64>()
                    .map(Amount::from_minor_units)
                    .map_err(|_| StoreError::CorruptValue { key, value }),
            }
        })
    }

    fn increment_traded<'a>(
        &'a self,
        user_id: &'a UserId,
        day: TradingDay,
        amount: Amount,
        ceiling: Amount,
        ttl: Duration,
    ) -> BoxFuture<'a, StoreResult<CommitOutcome>> {
        Box::pin(async move {
            let key = traded_key(user_id, day);
            let delta = to_minor_units(amount)?;
            let ceiling_units = to_minor_units(ceiling)?;
            let ttl_secs = ttl.as_secs().max(1);

            let mut conn = self.conn.clone();
            let (committed, total): (i64, i64) = self
                .commit_script
                .key(&key)
                .arg(delta)
                .arg(ceiling_units)
                .arg(ttl_secs)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| StoreError::unavailable("increment_traded", e))?;

            trace!(key = %key, committed, total, "Commit script result");

            let total = Amount::from_minor_units(total);
            if committed == 1 {
                Ok(CommitOutcome::Committed { new_total: total })
            } else {
                Ok(CommitOutcome::LimitExceeded {
                    current_total: total,
                })
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
