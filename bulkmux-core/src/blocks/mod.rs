//! Block tracking + bulk batching.
//!
//! A "bulk" is a run of commands joined into one batch:
//! - static mode: flushed every `max_pool_size` commands or on `EOF`
//! - explicit mode: everything between the outermost `{` and `}`
//!
//! Tracker turns raw commands into boundary events; Batcher turns events into batches.

pub mod batcher;
pub mod tracker;

pub use batcher::Batcher;
pub use tracker::{DepthTracker, TrackerEvent};
