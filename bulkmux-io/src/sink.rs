//! Fan-out of flushed batches.
//!
//! Both sinks see every batch in flush order. The log sink queues all of
//! them (empty ones included, the log writer drops those after popping);
//! the file sink only queues batches that have something to persist.
//!
//! The queues are unbounded crossbeam channels. Dropping the sinks closes
//! them, which is how writer threads learn that their session is gone.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::command::Command;

/// Consumer ends handed to the writer pool.
#[derive(Debug)]
pub struct SinkQueues {
    pub log: Receiver<Command>,
    pub file: Receiver<Command>,
}

#[derive(Debug)]
pub struct LogSink {
    tx: Sender<Command>,
}

impl LogSink {
    pub fn push(&self, batch: Command) {
        if self.tx.send(batch).is_err() {
            tracing::warn!("log writer is gone, batch dropped");
        }
    }
}

#[derive(Debug)]
pub struct FileSink {
    tx: Sender<Command>,
}

impl FileSink {
    pub fn push(&self, batch: Command) {
        if batch.is_empty() {
            return;
        }
        if self.tx.send(batch).is_err() {
            tracing::warn!("file writers are gone, batch dropped");
        }
    }
}

/// The last stage of a session pipeline: log sink first, then file sink.
#[derive(Debug)]
pub struct Fanout {
    log: LogSink,
    file: FileSink,
}

impl Fanout {
    /// Build both sinks together with the queues their writers drain.
    pub fn channel() -> (Self, SinkQueues) {
        let (log_tx, log_rx) = unbounded();
        let (file_tx, file_rx) = unbounded();

        let fanout = Self {
            log: LogSink { tx: log_tx },
            file: FileSink { tx: file_tx },
        };
        let queues = SinkQueues {
            log: log_rx,
            file: file_rx,
        };

        (fanout, queues)
    }

    pub fn dispatch(&self, batch: Command) {
        self.log.push(batch.clone());
        self.file.push(batch);
    }
}
