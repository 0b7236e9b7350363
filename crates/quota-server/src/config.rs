//! Application configuration.
//!
//! Sources, lowest precedence first:
//! 1. the TOML file (missing file means all defaults)
//! 2. `QUOTA__{SECTION}__{KEY}` environment variables
//! 3. the legacy `PORT` and `REDIS_ADDR` variables
//!
//! Every field has a default, so an empty file is a valid configuration.

use crate::error::{AppError, AppResult};
use quota_audit::AuditConfig;
use quota_engine::QuotaConfig;
use quota_store::{StoreBackend, StoreConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

/// Config file used when neither `--config` nor `QUOTA_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix of structured environment overrides.
const ENV_PREFIX: &str = "QUOTA";

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_port() -> u16 {
    8080
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid bind_addr {}: {e}", self.bind_addr)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
}

impl AppConfig {
    /// Load from `path` plus the process environment, then validate.
    pub fn load(path: &str) -> AppResult<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load from `path` with `vars` standing in for the environment.
    pub fn load_with_env(path: &str, vars: config::Map<String, String>) -> AppResult<Self> {
        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(Some(vars.clone()));

        let mut config: Self = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(environment)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::Config(format!("Failed to load {path}: {e}")))?;

        config.apply_legacy_env(|name| vars.get(name).cloned())?;
        config.validate()?;

        info!(
            path,
            port = config.server.port,
            backend = ?config.store.backend,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PORT` and `REDIS_ADDR` (`host:port`).
    ///
    /// `REDIS_ADDR` also selects the Redis backend.
    pub fn apply_legacy_env(&mut self, var: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid PORT {port}: {e}")))?;
        }
        if let Some(addr) = var("REDIS_ADDR").filter(|a| !a.trim().is_empty()) {
            self.store.backend = StoreBackend::Redis;
            self.store.redis_url = format!("redis://{}", addr.trim());
        }
        Ok(())
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        self.server.socket_addr()?;
        if self.store.timeout_ms == 0 {
            return Err(AppError::Config("store.timeout_ms must be > 0".to_string()));
        }
        if self.store.backend == StoreBackend::Redis && self.store.redis_url.trim().is_empty() {
            return Err(AppError::Config(
                "store.redis_url is required for the redis backend".to_string(),
            ));
        }
        if self.audit.timeout_ms == 0 {
            return Err(AppError::Config("audit.timeout_ms must be > 0".to_string()));
        }
        if self.audit.channel_capacity == 0 {
            return Err(AppError::Config(
                "audit.channel_capacity must be > 0".to_string(),
            ));
        }
        if self.audit.topic.trim().is_empty() {
            return Err(AppError::Config("audit.topic must not be empty".to_string()));
        }
        self.quota
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}
