//! The command value that flows through a session.
//!
//! A flushed batch is a `Command` too: its payload is the joined pool and its
//! timestamp is the one of the first command in that pool.
//!
//! Payloads are raw bytes. Nothing on the way to disk assumes UTF-8; only the
//! console line renders them lossily.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opens an explicit block.
pub const OPEN_BLOCK: &[u8] = b"{";
/// Closes one level of explicit block.
pub const CLOSE_BLOCK: &[u8] = b"}";
/// Hard reset: flushes in static mode, discards inside an explicit block.
pub const END_OF_INPUT: &[u8] = b"EOF";
/// Separator between commands in a joined batch.
pub const BATCH_SEPARATOR: &[u8] = b", ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl Command {
    pub fn new(payload: impl Into<Vec<u8>>, created_at: DateTime<Utc>) -> Self {
        Self {
            payload: payload.into(),
            created_at,
        }
    }

    /// Stamp a command with the current wall clock.
    pub fn now(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(payload, Utc::now())
    }

    /// The exact bytes the caller sent.
    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Display form; invalid UTF-8 becomes U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Nanoseconds since the Unix epoch. Saturates to 0 outside the i64 range
    /// (roughly years 1677..2262).
    pub fn timestamp_nanos(&self) -> i64 {
        self.created_at.timestamp_nanos_opt().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn is_end_of_input(&self) -> bool {
        self.payload == END_OF_INPUT
    }
}
