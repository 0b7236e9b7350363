//! Trading day resolution.
//!
//! The trading day is the UTC calendar date. Daily quotas accumulate per
//! trading day and reset at 00:00 UTC because counters are keyed by the day.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key format for trading days (`YYYY-MM-DD`).
const DAY_FORMAT: &str = "%Y-%m-%d";

/// UTC calendar day against which a user's daily quota accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradingDay(NaiveDate);

impl TradingDay {
    /// Trading day for the current UTC time.
    #[must_use]
    pub fn current() -> Self {
        Self::at(Utc::now())
    }

    /// Trading day containing the given UTC instant.
    #[must_use]
    pub fn at(dt: DateTime<Utc>) -> Self {
        Self(dt.date_naive())
    }

    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following trading day.
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.succ_opt().unwrap_or(self.0))
    }

    /// Instant at which this trading day ends (next 00:00 UTC).
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.next().0.and_time(NaiveTime::MIN).and_utc()
    }

    /// Whole seconds from `now` until the end of this trading day, at least 1.
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u64 {
        let secs = (self.ends_at() - now).num_seconds();
        u64::try_from(secs).unwrap_or(0).max(1)
    }

    /// Key segment used in store keys.
    pub fn key(&self) -> String {
        self.0.format(DAY_FORMAT).to_string()
    }
}

impl fmt::Display for TradingDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}
