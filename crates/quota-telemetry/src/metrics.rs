//! Prometheus metrics for the quota service.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a fatal configuration error that should
//! crash at startup. These panics only happen during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};

/// Decisions returned to callers.
/// Labels: decision (approved/rejected/unavailable), reason
pub static DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quota_decisions_total",
        "Total trade evaluations by outcome",
        &["decision", "reason"]
    )
    .unwrap()
});

/// Limit store failures (errors and timeouts).
pub static STORE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quota_store_errors_total",
        "Total limit store failures by operation",
        &["op"]
    )
    .unwrap()
});

/// Approvals overturned because a concurrent commit used the headroom first.
pub static COMMIT_RACE_LOST_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "quota_commit_race_lost_total",
        "Approvals rejected at commit because the limit was reached concurrently"
    )
    .unwrap()
});

/// Audit publish attempts.
/// Labels: result (ok/error)
pub static PUBLISH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quota_publish_total",
        "Total risk event publish attempts by result",
        &["result"]
    )
    .unwrap()
});

/// End-to-end evaluation latency.
pub static EVALUATION_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "quota_evaluation_latency_ms",
        "Trade evaluation latency in milliseconds",
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a decision returned to the caller.
    pub fn decision(decision: &str, reason: &str) {
        DECISIONS_TOTAL.with_label_values(&[decision, reason]).inc();
    }

    /// Record a failed store call.
    pub fn store_error(op: &str) {
        STORE_ERRORS_TOTAL.with_label_values(&[op]).inc();
    }

    pub fn commit_race_lost() {
        COMMIT_RACE_LOST_TOTAL.inc();
    }

    /// Record an audit publish attempt.
    pub fn publish(ok: bool) {
        let result = if ok { "ok" } else { "error" };
        PUBLISH_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn evaluation_latency(latency_ms: f64) {
        EVALUATION_LATENCY_MS.observe(latency_ms);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_metrics() {
        Metrics::decision("rejected", "DAILY_LIMIT_EXCEEDED");
        Metrics::store_error("get_daily_limit");
        Metrics::commit_race_lost();
        Metrics::publish(false);
        Metrics::evaluation_latency(3.0);

        let text = Metrics::render().unwrap();
        assert!(text.contains("quota_decisions_total"));
        assert!(text.contains("reason=\"DAILY_LIMIT_EXCEEDED\""));
        assert!(text.contains("quota_store_errors_total"));
        assert!(text.contains("quota_commit_race_lost_total"));
        assert!(text.contains("quota_publish_total{result=\"error\"}"));
        assert!(text.contains("quota_evaluation_latency_ms_bucket"));
    }

    #[test]
    fn test_counters_accumulate() {
        let before = PUBLISH_TOTAL.with_label_values(&["ok"]).get();
        Metrics::publish(true);
        Metrics::publish(true);
        let after = PUBLISH_TOTAL.with_label_values(&["ok"]).get();
        assert!(after - before >= 2.0);
    }
}
