//! JSON Lines file writer for audit messages.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete `AuditMessage`
//! - Partial file corruption only affects individual lines
//! - Files are opened in append mode, so restarts never truncate
//! - One file per topic per UTC day: `{base_dir}/{topic}_{YYYY-MM-DD}.jsonl`
//!
//! A failed flush keeps only the records not yet handed to the file, so a
//! retry never duplicates lines. The pending buffer is capped; overflow is
//! dropped and counted.

use crate::error::{PersistenceError, PersistenceResult};
use crate::publisher::AuditMessage;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Active writer state for daily file.
struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// JSON Lines writer for audit messages.
pub struct JsonLinesWriter {
    /// Base directory for output files.
    base_dir: PathBuf,
    /// File name prefix.
    topic: String,
    /// Buffer of pending messages.
    buffer: Vec<AuditMessage>,
    /// Maximum buffer size before flush.
    max_buffer_size: usize,
    /// Hard cap on unwritten records.
    max_pending: usize,
    /// Records written since creation.
    total_written: usize,
    /// Records dropped on overflow or serialization failure.
    dropped: usize,
    /// Active writer (open until date rotation).
    active_writer: Option<ActiveWriter>,
}

/// Default cap on unwritten records.
const DEFAULT_MAX_PENDING: usize = 10_000;

impl JsonLinesWriter {
    /// Create a new JSON Lines writer, creating `base_dir` if needed.
    pub fn new(base_dir: impl Into<PathBuf>, topic: &str, max_buffer_size: usize) -> PersistenceResult<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            topic: topic.to_string(),
            buffer: Vec::with_capacity(max_buffer_size.max(1)),
            max_buffer_size: max_buffer_size.max(1),
            max_pending: DEFAULT_MAX_PENDING.max(max_buffer_size),
            total_written: 0,
            dropped: 0,
            active_writer: None,
        })
    }

    /// Cap the number of unwritten records (at least the flush size).
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(self.max_buffer_size);
        self
    }

    /// Add a message to the buffer, flushing once it is full.
    ///
    /// Returns `BufferFull` without buffering when the cap is reached. Any
    /// other error comes from the flush; the message stays buffered.
    pub fn add_record(&mut self, message: AuditMessage) -> PersistenceResult<()> {
        if self.buffer.len() >= self.max_pending {
            self.dropped += 1;
            return Err(PersistenceError::BufferFull {
                capacity: self.max_pending,
            });
        }
        self.buffer.push(message);

        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Number of buffered, unflushed messages.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Records written to disk so far.
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Records dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Close the active writer.
    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "Failed to flush audit writer on close");
            }
            info!(
                date = %active.date,
                records = active.records_written,
                "Closed audit JSON Lines writer"
            );
        }
    }

    /// Create a new writer for the given date.
    fn create_new_writer(&mut self, date: &str) -> PersistenceResult<()> {
        let path = self.base_dir.join(format!("{}_{}.jsonl", self.topic, date));

        info!(path = %path.display(), "Opening audit JSON Lines writer (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        self.active_writer = Some(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });

        Ok(())
    }

    /// Flush buffer to today's file.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        self.flush_at(Utc::now())
    }

    /// Flush buffer to the file for `now`'s UTC date.
    pub fn flush_at(&mut self, now: DateTime<Utc>) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let today = now.format("%Y-%m-%d").to_string();

        let needs_rotation = self
            .active_writer
            .as_ref()
            .map(|w| w.date != today)
            .unwrap_or(false);

        if needs_rotation {
            self.close_active_writer();
        }

        if self.active_writer.is_none() {
            self.create_new_writer(&today)?;
        }

        let Some(active) = self.active_writer.as_mut() else {
            return Ok(());
        };

        let mut consumed = 0usize;
        let mut written = 0usize;
        let mut result: PersistenceResult<()> = Ok(());
        for message in &self.buffer {
            let json = match serde_json::to_string(message) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, key = %message.key, "Dropping unserializable audit message");
                    self.dropped += 1;
                    consumed += 1;
                    continue;
                }
            };
            if let Err(e) = writeln!(active.writer, "{}", json) {
                result = Err(e.into());
                break;
            }
            consumed += 1;
            written += 1;
        }

        // Lines handed to the BufWriter are retried by it, not by us
        self.buffer.drain(..consumed);
        active.records_written += written;
        self.total_written += written;

        result?;
        active.writer.flush()?;

        debug!(date = %today, records = written, "Flushed audit messages");

        Ok(())
    }

    /// Close the writer, flushing any pending data.
    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active_writer();
        Ok(())
    }
}

impl Drop for JsonLinesWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "Failed to flush audit buffer on drop");
        }
        self.close_active_writer();
    }
}
