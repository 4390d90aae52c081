//! NDJSON writer for scheduler events.
//!
//! Each line is one JSON object:
//!
//! ```json
//! {"seq":1,"ts":"2025-01-01T00:00:00Z","event":"scheduler_started","payload":{}}
//! ```

use std::io::Write;

use lienwatch_core::{SchedulerEvent, SchedulerEventKind, UtcDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single stream line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamLine {
    /// Monotonically increasing sequence number (starting from 1).
    pub seq: u64,
    /// When the scheduler emitted the event.
    pub ts: UtcDateTime,
    pub event: SchedulerEventKind,
    pub payload: Value,
}

/// Writer for NDJSON stream events. Not thread-safe; wrap in a mutex to share.
pub struct NdjsonStreamWriter<W: Write> {
    writer: W,
    next_seq: u64,
}

impl<W: Write> NdjsonStreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_seq: 1,
        }
    }

    pub fn write_event(&mut self, event: &SchedulerEvent) -> Result<(), StreamError> {
        let line = StreamLine {
            seq: self.next_seq,
            ts: event.timestamp,
            event: event.kind,
            payload: event.payload.clone(),
        };
        self.next_seq += 1;

        let payload = serde_json::to_string(&line)?;
        self.writer.write_all(payload.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Sequence number the next line will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Error type for stream operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
