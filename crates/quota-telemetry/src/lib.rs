//! Prometheus metrics and structured logging for the quota service.
//!
//! - Decision counters by outcome and reason
//! - Store and audit transport failure counters
//! - Evaluation latency histogram
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
