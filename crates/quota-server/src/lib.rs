//! Trade quota service.
//!
//! Wires the quota coordinator to:
//! - configuration (TOML file, `QUOTA__*` and legacy env overrides)
//! - the HTTP API (`/api/v1/risk/...`, health, metrics)
//! - the audit writer lifecycle (drained on shutdown)

pub mod app;
pub mod config;
pub mod error;
pub mod routes;

pub use app::Application;
pub use config::AppConfig;
pub use error::{ApiError, AppError, AppResult};
pub use routes::{create_router, AppState};
