//! Limit and daily counter storage.
//!
//! Provides:
//! - `LimitStore`: backend trait exposing get/set and an atomic
//!   increment-and-validate primitive for daily counters
//! - `InMemoryLimitStore`: DashMap backend with per-key expiry
//! - `RedisLimitStore`: Redis backend, counters committed by a Lua script
//! - `LimitStoreAdapter`: default limits, TTLs and per-call timeouts on top
//!   of any backend
//!
//! Keys:
//! - `user:{user_id}:daily_limit` holds a per-user override
//! - `user:{user_id}:traded:{YYYY-MM-DD}` holds the day's total in minor units

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;

pub use adapter::LimitStoreAdapter;
pub use backend::{BoxFuture, CommitOutcome, LimitStore};
pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::{spawn_expiry_sweeper, InMemoryLimitStore};
pub use redis_store::RedisLimitStore;

use std::sync::Arc;
use tracing::info;

/// Build the backend selected by configuration.
///
/// The in-memory backend also gets its expiry sweeper, which stops once the
/// store is dropped.
pub async fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn LimitStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory limit store");
            let store = Arc::new(InMemoryLimitStore::new());
            spawn_expiry_sweeper(&store, config.sweep_interval());
            Ok(store)
        }
        StoreBackend::Redis => {
            let store = RedisLimitStore::connect(&config.redis_url).await?;
            Ok(Arc::new(store))
        }
    }
}
