//! # Bulkmux IO
//!
//! The Writer Layer.
//! Everything that leaves a session goes through here: flushed batches are
//! pushed into two sinks and drained by dedicated writer threads.
//!
//! - one log writer prints `bulk_<id>: <text>` lines to the console
//! - two file writers race on a shared queue and persist one file per batch

pub mod command;
pub mod console;
pub mod error;
pub mod sink;
pub mod writer;

pub use command::{BATCH_SEPARATOR, CLOSE_BLOCK, Command, END_OF_INPUT, OPEN_BLOCK};
pub use console::{ConsoleTarget, SharedBuffer};
pub use error::WriteError;
pub use sink::{Fanout, FileSink, LogSink, SinkQueues};
pub use writer::{FILE_WRITERS, WriterPool, WriterSettings, artifact_name};
