//! In-memory limit store.
//!
//! DashMap backed. Counter increments run under the shard write lock of
//! the counter's key, so check-and-add is atomic per key. Expired keys are
//! removed when read, and the rest by the sweeper task started in
//! `spawn_expiry_sweeper`.
//!
//! Also supports fault injection (unavailability, per-call latency) so the
//! coordinator's error paths can be exercised without a real server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use quota_core::{Amount, TradingDay, UserId};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::backend::{BoxFuture, CommitOutcome, LimitStore};
use crate::error::{StoreError, StoreResult};
use crate::keys::{daily_limit_key, traded_key};

/// Counter value with its expiry.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    total: Amount,
    expires_at: Instant,
}

impl CounterEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local limit store.
#[derive(Debug, Default)]
pub struct InMemoryLimitStore {
    limits: DashMap<String, Amount>,
    counters: DashMap<String, CounterEntry>,
    /// Every call fails with `Unavailable` while set.
    unavailable: AtomicBool,
    /// Only `increment_traded` fails while set.
    commits_unavailable: AtomicBool,
    /// Only reads fail while set.
    reads_unavailable: AtomicBool,
    /// Delay applied before every call.
    latency: Mutex<Option<Duration>>,
}

impl InMemoryLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the server were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only counter commits fail.
    pub fn set_commits_unavailable(&self, unavailable: bool) {
        self.commits_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only reads fail.
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.reads_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Drop expired counters. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.counters.len();
        if removed > 0 {
            debug!(removed, "Purged expired counters");
        }
        removed
    }

    /// Number of live counter keys.
    pub fn counter_count(&self) -> usize {
        let now = Instant::now();
        self.counters
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Number of stored counter keys, expired or not.
    pub fn stored_counter_count(&self) -> usize {
        self.counters.len()
    }

    async fn before_call(&self, op: &'static str) -> StoreResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(op, "injected outage"));
        }
        Ok(())
    }

    fn before_read(&self, op: &'static str) -> StoreResult<()> {
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(op, "injected read outage"));
        }
        Ok(())
    }

    fn read_counter(&self, key: &str) -> Amount {
        let now = Instant::now();
        if self
            .counters
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            return Amount::ZERO;
        }
        self.counters
            .get(key)
            .map(|entry| entry.total)
            .unwrap_or(Amount::ZERO)
    }

    /// Check-and-add under the key's shard lock.
    fn increment_locked(
        &self,
        key: String,
        amount: Amount,
        ceiling: Amount,
        ttl: Duration,
    ) -> CommitOutcome {
        let now = Instant::now();
        match self.counters.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let current = if entry.is_expired(now) {
                    Amount::ZERO
                } else {
                    entry.total
                };
                let new_total = current + amount;
                if new_total > ceiling {
                    if entry.is_expired(now) {
                        occupied.remove();
                    }
                    return CommitOutcome::LimitExceeded {
                        current_total: current,
                    };
                }
                entry.total = new_total;
                entry.expires_at = now + ttl;
                CommitOutcome::Committed { new_total }
            }
            Entry::Vacant(vacant) => {
                if amount > ceiling {
                    return CommitOutcome::LimitExceeded {
                        current_total: Amount::ZERO,
                    };
                }
                vacant.insert(CounterEntry {
                    total: amount,
                    expires_at: now + ttl,
                });
                CommitOutcome::Committed { new_total: amount }
            }
        }
    }
}

/// Periodically purge expired counters.
///
/// Holds only a weak reference; the task ends once the store is dropped.
pub fn spawn_expiry_sweeper(store: &Arc<InMemoryLimitStore>, period: Duration) -> JoinHandle<()> {
    let store: Weak<InMemoryLimitStore> = Arc::downgrade(store);
    info!(period_secs = period.as_secs(), "Starting counter expiry sweeper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                debug!("Limit store dropped, stopping expiry sweeper");
                break;
            };
            store.purge_expired();
        }
    })
}

impl LimitStore for InMemoryLimitStore {
    fn get_limit_override<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, StoreResult<Option<Amount>>> {
        Box::pin(async move {
            self.before_call("get_limit_override").await?;
            self.before_read("get_limit_override")?;
            let key = daily_limit_key(user_id);
            Ok(self.limits.get(&key).map(|limit| *limit))
        })
    }

    fn set_limit_override<'a>(
        &'a self,
        user_id: &'a UserId,
        limit: Amount,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.before_call("set_limit_override").await?;
            self.limits.insert(daily_limit_key(user_id), limit);
            Ok(())
        })
    }

    fn get_traded<'a>(
        &'a self,
        user_id: &'a UserId,
        day: TradingDay,
    ) -> BoxFuture<'a, StoreResult<Amount>> {
        Box::pin(async move {
            self.before_call("get_traded").await?;
            self.before_read("get_traded")?;
            Ok(self.read_counter(&traded_key(user_id, day)))
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
            self.before_call("increment_traded").await?;
            if self.commits_unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable(
                    "increment_traded",
                    "injected commit outage",
                ));
            }
            let outcome = self.increment_locked(traded_key(user_id, day), amount, ceiling, ttl);
            trace!(user_id = %user_id, %day, ?outcome, "Counter increment");
            Ok(outcome)
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
