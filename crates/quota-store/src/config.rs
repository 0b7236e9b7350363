//! Store configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map. State is lost on restart.
    #[default]
    Memory,
    /// Redis server at `redis_url`.
    Redis,
}

/// Limit store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra counter lifetime past the end of the trading day, in seconds.
    /// Reads are keyed by day, so the counter is already invisible to the
    /// next day; the grace only keeps it around for inspection.
    #[serde(default = "default_ttl_grace_secs")]
    pub ttl_grace_secs: u64,
    /// How often the in-memory backend purges expired counters, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_ttl_grace_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            timeout_ms: default_timeout_ms(),
            ttl_grace_secs: default_ttl_grace_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn ttl_grace(&self) -> Duration {
        Duration::from_secs(self.ttl_grace_secs)
    }

    /// Sweep period, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: StoreConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.ttl_grace_secs, 3600);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_redis_backend_parses() {
        let config: StoreConfig =
            toml::from_str("backend = \"redis\"\nredis_url = \"redis://cache:6379\"").unwrap();
        assert_eq!(config.backend, StoreBackend::Redis);
        assert_eq!(config.redis_url, "redis://cache:6379");
    }
}
