//! Channel-backed audit transport.
//!
//! `ChannelPublisher` pushes messages into a bounded FIFO; the writer task
//! drains it into `JsonLinesWriter`. The task exits once every publisher
//! clone is dropped and the channel is empty, closing the file on the way out.

use std::time::Duration;

use quota_core::{BoxFuture, RiskEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::AuditConfig;
use crate::error::{PersistenceError, PersistenceResult, PublishError, PublishResult};
use crate::publisher::{AuditMessage, AuditPublisher};
use crate::writer::JsonLinesWriter;

/// Publisher half of the audit channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    topic: String,
    tx: mpsc::Sender<AuditMessage>,
    send_timeout: Duration,
}

impl ChannelPublisher {
    /// Create a publisher and the receiver it feeds.
    pub fn new(
        topic: &str,
        capacity: usize,
        send_timeout: Duration,
    ) -> (Self, mpsc::Receiver<AuditMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let publisher = Self {
            topic: topic.to_string(),
            tx,
            send_timeout,
        };
        (publisher, rx)
    }
}

impl AuditPublisher for ChannelPublisher {
    fn publish<'a>(&'a self, event: &'a RiskEvent) -> BoxFuture<'a, PublishResult<()>> {
        Box::pin(async move {
            let message = AuditMessage::from_event(&self.topic, event)?;
            match tokio::time::timeout(self.send_timeout, self.tx.send(message)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(PublishError::TransportClosed),
                Err(_) => Err(PublishError::Timeout {
                    timeout_ms: u64::try_from(self.send_timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Handle to the background writer task.
pub struct AuditWriterHandle {
    task: JoinHandle<PersistenceResult<usize>>,
}

impl AuditWriterHandle {
    /// Wait for the writer to drain and close.
    ///
    /// Returns once every `ChannelPublisher` clone has been dropped. Yields
    /// the number of messages written.
    pub async fn shutdown(self) -> PersistenceResult<usize> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(format!("audit writer task failed: {e}")).into()),
        }
    }
}

/// Start the JSON Lines audit transport.
pub fn spawn_audit_writer(
    config: &AuditConfig,
) -> PersistenceResult<(ChannelPublisher, AuditWriterHandle)> {
    let writer = JsonLinesWriter::new(&config.data_dir, &config.topic, config.buffer_size)?
        .with_max_pending(config.max_pending);
    let (publisher, rx) =
        ChannelPublisher::new(&config.topic, config.channel_capacity, config.timeout());

    info!(
        data_dir = %config.data_dir,
        topic = %config.topic,
        capacity = config.channel_capacity,
        "Audit writer started"
    );

    let task = tokio::spawn(run_writer(writer, rx));
    Ok((publisher, AuditWriterHandle { task }))
}

async fn run_writer(
    mut writer: JsonLinesWriter,
    mut rx: mpsc::Receiver<AuditMessage>,
) -> PersistenceResult<usize> {
    while let Some(message) = rx.recv().await {
        write_one(&mut writer, message);

        // Drain whatever is already queued, then flush once
        while let Ok(message) = rx.try_recv() {
            write_one(&mut writer, message);
        }
        if let Err(e) = writer.flush() {
            error!(error = %e, pending = writer.pending(), "Audit flush failed");
        }
    }

    writer.close()?;
    let written = writer.total_written();
    info!(written, dropped = writer.dropped(), "Audit writer stopped");
    Ok(written)
}

fn write_one(writer: &mut JsonLinesWriter, message: AuditMessage) {
    let key = message.key.clone();
    match writer.add_record(message) {
        Ok(()) => {}
        Err(PersistenceError::BufferFull { capacity }) => {
            warn!(key = %key, capacity, "Audit buffer full, message dropped");
        }
        Err(e) => {
            // The message is buffered and retried on the next flush
            warn!(error = %e, pending = writer.pending(), "Audit flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quota_core::{Amount, Price, RiskDecision, TradeRequest, TradeSide, TradingDay, UserId};
    use rust_decimal_macros::dec;
    use std::io::{BufRead, BufReader};
    use tempfile::TempDir;

    fn event(user: &str, amount: u32) -> RiskEvent {
        let request = TradeRequest::new(
            UserId::new(user).unwrap(),
            "AMD",
            TradeSide::Buy,
            Amount::from(amount),
            Price::new(dec!(150)),
        )
        .unwrap();
        let now = Utc::now();
        RiskEvent::from_decision(&request, &RiskDecision::approve(), TradingDay::at(now), now)
    }

    #[tokio::test]
    async fn test_events_written_in_publish_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = AuditConfig {
            data_dir: temp_dir.path().to_str().unwrap().to_string(),
            ..Default::default()
        };

        let (publisher, handle) = spawn_audit_writer(&config).unwrap();
        for amount in 1..=20 {
            publisher.publish(&event("lee", amount)).await.unwrap();
        }
        drop(publisher);

        let written = handle.shutdown().await.unwrap();
        assert_eq!(written, 20);

        let path = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let amounts: Vec<String> = BufReader::new(std::fs::File::open(path).unwrap())
            .lines()
            .map_while(Result::ok)
            .map(|line| {
                let message: AuditMessage = serde_json::from_str(&line).unwrap();
                assert_eq!(message.key, "lee");
                message.payload["amount"].as_str().unwrap().to_string()
            })
            .collect();
        let expected: Vec<String> = (1..=20).map(|a: u32| a.to_string()).collect();
        assert_eq!(amounts, expected);
    }

    #[tokio::test]
    async fn test_publish_after_receiver_dropped() {
        let (publisher, rx) = ChannelPublisher::new("risk-events", 4, Duration::from_millis(50));
        drop(rx);
        assert_eq!(
            publisher.publish(&event("max", 1)).await,
            Err(PublishError::TransportClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_times_out_when_full() {
        let (publisher, _rx) = ChannelPublisher::new("risk-events", 1, Duration::from_millis(50));
        publisher.publish(&event("nia", 1)).await.unwrap();
        assert_eq!(
            publisher.publish(&event("nia", 2)).await,
            Err(PublishError::Timeout { timeout_ms: 50 })
        );
    }
}
