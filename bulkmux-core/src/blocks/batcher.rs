//! Bulk batcher.
//!
//! Inputs:
//! - block boundaries from the tracker (`on_start_block` / `on_finish_block`)
//! - literal commands (`on_command`)
//!
//! Output:
//! - at most one batch per input, returned to the caller for fan-out
//!
//! An `EOF` inside an explicit block throws the block away, EOF included.
//! That is the reset contract callers rely on; don't turn it into a flush.

use std::num::NonZeroUsize;

use bulkmux_io::{BATCH_SEPARATOR, Command};
use tracing::debug;

#[derive(Debug)]
pub struct Batcher {
    pool: Vec<Command>,
    explicit_block: bool,
    max_pool_size: NonZeroUsize,
}

impl Batcher {
    pub fn new(max_pool_size: NonZeroUsize) -> Self {
        Self {
            pool: Vec::with_capacity(max_pool_size.get()),
            explicit_block: false,
            max_pool_size,
        }
    }

    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size.get()
    }

    /// Commands buffered since the last flush.
    pub fn pending(&self) -> usize {
        self.pool.len()
    }

    pub fn in_explicit_block(&self) -> bool {
        self.explicit_block
    }

    /// Anything collected in static mode goes out before the block starts.
    pub fn on_start_block(&mut self) -> Option<Command> {
        self.explicit_block = true;
        self.flush()
    }

    /// The whole block goes out as one batch, regardless of size.
    pub fn on_finish_block(&mut self) -> Option<Command> {
        self.explicit_block = false;
        self.flush()
    }

    pub fn on_command(&mut self, command: Command) -> Option<Command> {
        let end_of_input = command.is_end_of_input();
        self.pool.push(command);

        if self.explicit_block {
            if end_of_input {
                debug!(discarded = self.pool.len(), "explicit block interrupted by EOF");
                self.pool.clear();
                self.explicit_block = false;
            }
            return None;
        }

        if end_of_input || self.pool.len() >= self.max_pool_size.get() {
            return self.flush();
        }
        None
    }

    /// Join the pool into one batch. Empty texts are skipped in the join but
    /// a pool of only empty texts still yields a (blank) batch.
    pub fn flush(&mut self) -> Option<Command> {
        let started_at = self.pool.first()?.created_at();

        let payload = self
            .pool
            .iter()
            .map(Command::bytes)
            .filter(|bytes| !bytes.is_empty())
            .collect::<Vec<_>>()
            .join(BATCH_SEPARATOR);

        debug!(commands = self.pool.len(), "bulk flushed");
        self.pool.clear();

        Some(Command::new(payload, started_at))
    }

    /// Teardown: static mode drains, an open explicit block is dropped.
    pub fn close(&mut self) -> Option<Command> {
        if self.explicit_block {
            if !self.pool.is_empty() {
                debug!(discarded = self.pool.len(), "explicit block abandoned on close");
            }
            self.pool.clear();
            return None;
        }
        self.flush()
    }
}
