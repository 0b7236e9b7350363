//! Audit transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audit transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Topic written on every message.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Directory for JSON Lines files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Pending messages held before publishers start waiting.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Maximum time a publish may wait for channel capacity (ms).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Records buffered before a forced flush.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Unwritten records kept while the disk is failing. Further messages
    /// are dropped and counted.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_topic() -> String {
    "risk-events".to_string()
}

fn default_data_dir() -> String {
    "data/audit".to_string()
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_timeout_ms() -> u64 {
    200
}

fn default_buffer_size() -> usize {
    1
}

fn default_max_pending() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            data_dir: default_data_dir(),
            channel_capacity: default_channel_capacity(),
            timeout_ms: default_timeout_ms(),
            buffer_size: default_buffer_size(),
            max_pending: default_max_pending(),
        }
    }
}

impl AuditConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
