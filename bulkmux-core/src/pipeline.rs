use std::num::NonZeroUsize;

use bulkmux_io::{Command, Fanout};

use crate::blocks::{Batcher, DepthTracker, TrackerEvent};

/// One session's fixed chain: tracker -> batcher -> fan-out.
///
/// Not thread safe on its own; the registry lock serializes every `feed`.
#[derive(Debug)]
pub struct Pipeline {
    tracker: DepthTracker,
    batcher: Batcher,
    // None once closed. Dropping the fan-out closes the writer queues.
    fanout: Option<Fanout>,
}

impl Pipeline {
    pub fn new(max_pool_size: NonZeroUsize, fanout: Fanout) -> Self {
        Self {
            tracker: DepthTracker::new(),
            batcher: Batcher::new(max_pool_size),
            fanout: Some(fanout),
        }
    }

    pub fn feed(&mut self, command: Command) {
        let batch = match self.tracker.handle(command) {
            Some(TrackerEvent::StartBlock) => self.batcher.on_start_block(),
            Some(TrackerEvent::FinishBlock) => self.batcher.on_finish_block(),
            Some(TrackerEvent::Command(command)) => self.batcher.on_command(command),
            None => None,
        };

        if let Some(batch) = batch {
            self.dispatch(batch);
        }
    }

    /// Flush per the teardown rule, then close the writer queues.
    /// Feeding a closed pipeline drops whatever it would have emitted.
    pub fn close(&mut self) {
        if let Some(batch) = self.batcher.close() {
            self.dispatch(batch);
        }
        self.fanout = None;
    }

    pub fn is_closed(&self) -> bool {
        self.fanout.is_none()
    }

    pub fn depth(&self) -> usize {
        self.tracker.depth()
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    fn dispatch(&self, batch: Command) {
        match &self.fanout {
            Some(fanout) => fanout.dispatch(batch),
            None => tracing::warn!("pipeline closed, batch dropped"),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}
