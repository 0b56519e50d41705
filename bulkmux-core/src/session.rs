//! A session: one pipeline plus the three writer threads draining it.
//!
//! The session is the single owner of both. Teardown order matters:
//! 1. close the pipeline (teardown flush, then the queues close)
//! 2. join the writers (they drain what is left, then exit)
//!
//! Only after that is anything freed, so no worker can outlive its queues.

use std::fmt;
use std::num::NonZeroUsize;

use bulkmux_io::{Command, Fanout, WriterPool, WriterSettings};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BulkConfig;
use crate::error::BulkError;
use crate::pipeline::Pipeline;

/// Opaque session handle. Unique among live sessions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl SessionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SessionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    pipeline: Pipeline,
    writers: WriterPool,
    last_stamp: Option<DateTime<Utc>>,
}

impl Session {
    /// Wire a fresh pipeline and start its writers.
    pub fn open(
        id: SessionId,
        max_pool_size: NonZeroUsize,
        config: &BulkConfig,
    ) -> Result<Self, BulkError> {
        let (fanout, queues) = Fanout::channel();

        let settings = WriterSettings {
            session_id: id.get(),
            prefix: config.log_prefix.clone(),
            output_dir: config.output_dir.clone(),
            console: config.console.clone(),
        };
        let writers = WriterPool::start(settings, queues).map_err(BulkError::SpawnWorker)?;

        Ok(Self {
            id,
            pipeline: Pipeline::new(max_pool_size, fanout),
            writers,
            last_stamp: None,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Stamp `payload` and push it through the pipeline.
    ///
    /// Stamps are strictly increasing within a session, so no two batches
    /// share a first-command timestamp (and therefore an artifact name).
    pub fn receive(&mut self, payload: impl Into<Vec<u8>>) {
        let stamp = next_stamp(Utc::now(), self.last_stamp);
        self.last_stamp = Some(stamp);
        self.pipeline.feed(Command::new(payload, stamp));
    }

    /// Tear down and wait for every writer. Returns once all output is on
    /// its way to disk / console.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.pipeline.is_closed() && self.writers.is_finished() {
            return;
        }
        self.pipeline.close();
        self.writers.join();
        debug!(session = %self.id, "session writers joined");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `now`, or 1ns past `last` when the clock stalled or stepped back.
fn next_stamp(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + TimeDelta::nanoseconds(1),
        _ => now,
    }
}
