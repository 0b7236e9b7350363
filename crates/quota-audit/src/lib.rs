//! Risk event publishing.
//!
//! Every decision becomes one `AuditMessage` on the `risk-events` topic,
//! keyed by user id. Publishing hands the message to a bounded FIFO channel;
//! a background task drains it into daily JSON Lines files. Per-key order is
//! the channel order.
//!
//! Publishing is best-effort with respect to the decision path: callers log
//! a `PublishError` and move on.

pub mod channel;
pub mod config;
pub mod error;
pub mod publisher;
pub mod writer;

pub use channel::{spawn_audit_writer, AuditWriterHandle, ChannelPublisher};
pub use config::AuditConfig;
pub use error::{PersistenceError, PersistenceResult, PublishError, PublishResult};
pub use publisher::{AuditMessage, AuditPublisher, RecordingPublisher};
pub use writer::JsonLinesWriter;
