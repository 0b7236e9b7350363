//! Audit publisher trait and message envelope.
//!
//! Provides a trait-based abstraction over the event transport so the
//! coordinator can be tested with a recording double and run against the
//! channel-backed writer in production.

use parking_lot::Mutex;
use quota_core::{BoxFuture, RiskEvent};
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, PublishResult};

/// One message on the audit transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditMessage {
    pub topic: String,
    /// Partition/ordering key (the user id).
    pub key: String,
    pub payload: serde_json::Value,
}

impl AuditMessage {
    /// Wrap a risk event, keyed by its user.
    pub fn from_event(topic: &str, event: &RiskEvent) -> PublishResult<Self> {
        let payload = serde_json::to_value(event)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;
        Ok(Self {
            topic: topic.to_string(),
            key: event.partition_key().to_string(),
            payload,
        })
    }
}

/// Trait for handing risk events to the audit transport.
///
/// Implementations must preserve submission order per key and must not
/// retry inline.
pub trait AuditPublisher: Send + Sync {
    /// Publish one event.
    fn publish<'a>(&'a self, event: &'a RiskEvent) -> BoxFuture<'a, PublishResult<()>>;

    /// Transport name for logs.
    fn name(&self) -> &'static str;
}

/// Publisher that records events in memory.
///
/// Used by tests and by embedders that consume events in-process.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<RiskEvent>>,
    /// Result returned by every publish while set.
    failure: Mutex<Option<PublishError>>,
    attempts: Mutex<usize>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent publish with `error` (`None` to recover).
    pub fn set_failure(&self, error: Option<PublishError>) {
        *self.failure.lock() = error;
    }

    /// Successfully published events, in order.
    pub fn events(&self) -> Vec<RiskEvent> {
        self.events.lock().clone()
    }

    /// Publish attempts, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
        *self.attempts.lock() = 0;
    }
}

impl AuditPublisher for RecordingPublisher {
    fn publish<'a>(&'a self, event: &'a RiskEvent) -> BoxFuture<'a, PublishResult<()>> {
        Box::pin(async move {
            *self.attempts.lock() += 1;
            if let Some(error) = self.failure.lock().clone() {
                return Err(error);
            }
            self.events.lock().push(event.clone());
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quota_core::{Amount, Price, RiskDecision, TradeRequest, TradeSide, TradingDay, UserId};
    use rust_decimal_macros::dec;

    fn sample_event(user: &str) -> RiskEvent {
        let request = TradeRequest::new(
            UserId::new(user).unwrap(),
            "NVDA",
            TradeSide::Buy,
            Amount::new(dec!(100)),
            Price::new(dec!(120.5)),
        )
        .unwrap();
        let now = Utc::now();
        RiskEvent::from_decision(&request, &RiskDecision::approve(), TradingDay::at(now), now)
    }

    #[test]
    fn test_message_keyed_by_user() {
        let event = sample_event("frank");
        let message = AuditMessage::from_event("risk-events", &event).unwrap();
        assert_eq!(message.topic, "risk-events");
        assert_eq!(message.key, "frank");
        assert_eq!(message.payload["decision"], "APPROVED");
        assert_eq!(message.payload["symbol"], "NVDA");
    }

    #[tokio::test]
    async fn test_recording_publisher_counts_failures() {
        let publisher = RecordingPublisher::new();
        let event = sample_event("gina");

        publisher.publish(&event).await.unwrap();
        publisher.set_failure(Some(PublishError::TransportClosed));
        assert_eq!(
            publisher.publish(&event).await,
            Err(PublishError::TransportClosed)
        );

        assert_eq!(publisher.attempts(), 2);
        assert_eq!(publisher.events().len(), 1);
    }
}
