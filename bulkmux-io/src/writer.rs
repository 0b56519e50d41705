//! Per-session writer threads.
//!
//! Each session gets exactly three OS threads:
//! - `bulk-<id>-log`    drains the log queue (single consumer, FIFO)
//! - `bulk-<id>-file-1` and `bulk-<id>-file-2` race on the file queue
//!
//! Workers block on their queue and exit once it is closed *and* empty, so
//! every batch flushed before teardown is still written. `join` waits for all
//! three; nothing in here outlives the pool.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use tracing::{debug, error};

use crate::command::Command;
use crate::console::ConsoleTarget;
use crate::error::WriteError;
use crate::sink::SinkQueues;

/// Number of file writer threads per session.
pub const FILE_WRITERS: u8 = 2;

/// What a session's writers need to know to produce their output.
#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub session_id: u32,
    pub prefix: String,
    pub output_dir: PathBuf,
    pub console: ConsoleTarget,
}

impl WriterSettings {
    /// `bulk_<id>`: the log line tag and the artifact name stem.
    pub fn tag(&self) -> String {
        format!("{}_{}", self.prefix, self.session_id)
    }
}

/// `<prefix>_<session>_<first command ns>_<writer>.log`
pub fn artifact_name(prefix: &str, session_id: u32, batch: &Command, writer_id: u8) -> String {
    format!(
        "{}_{}_{}_{}.log",
        prefix,
        session_id,
        batch.timestamp_nanos(),
        writer_id
    )
}

#[derive(Debug)]
pub struct WriterPool {
    session_id: u32,
    handles: Vec<JoinHandle<()>>,
}

impl WriterPool {
    /// Spawn the log writer and the file writers for one session.
    ///
    /// If a spawn fails the threads already started are left to exit on
    /// their own once the caller drops the sinks feeding them.
    pub fn start(settings: WriterSettings, queues: SinkQueues) -> io::Result<Self> {
        let settings = Arc::new(settings);
        let session_id = settings.session_id;
        let mut handles = Vec::with_capacity(1 + FILE_WRITERS as usize);

        let log_settings = Arc::clone(&settings);
        let log_queue = queues.log;
        handles.push(
            thread::Builder::new()
                .name(format!("bulk-{session_id}-log"))
                .spawn(move || run_log_writer(&log_settings, log_queue))?,
        );

        for writer_id in 1..=FILE_WRITERS {
            let file_settings = Arc::clone(&settings);
            let file_queue = queues.file.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("bulk-{session_id}-file-{writer_id}"))
                    .spawn(move || run_file_writer(&file_settings, file_queue, writer_id))?,
            );
        }

        debug!(session = session_id, "writer pool started");
        Ok(Self {
            session_id,
            handles,
        })
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// True once every worker has returned.
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    /// Wait for all workers. They only return after their queues are closed,
    /// so the sinks must be dropped before calling this.
    pub fn join(&mut self) {
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("bulk-writer").to_string();
            if handle.join().is_err() {
                error!(session = self.session_id, worker = %name, "writer thread panicked");
            }
        }
    }
}

impl Drop for WriterPool {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_log_writer(settings: &WriterSettings, queue: Receiver<Command>) {
    let tag = settings.tag();
    debug!(session = settings.session_id, "log writer started");

    for batch in queue.iter() {
        if batch.is_empty() {
            continue;
        }
        let line = format!("{}: {}\n", tag, batch.text());
        if let Err(e) = settings.console.write_line(&line).map_err(WriteError::from) {
            error!(session = settings.session_id, error = %e, "log writer failed");
        }
    }

    debug!(session = settings.session_id, "log writer stopped");
}

fn run_file_writer(settings: &WriterSettings, queue: Receiver<Command>, writer_id: u8) {
    debug!(session = settings.session_id, writer_id, "file writer started");

    for batch in queue.iter() {
        match write_artifact(settings, &batch, writer_id) {
            Ok(path) => debug!(session = settings.session_id, path = %path.display(), "bulk written"),
            Err(e) => error!(session = settings.session_id, writer_id, error = %e, "file writer failed"),
        }
    }

    debug!(session = settings.session_id, writer_id, "file writer stopped");
}

fn write_artifact(
    settings: &WriterSettings,
    batch: &Command,
    writer_id: u8,
) -> Result<PathBuf, WriteError> {
    let path = artifact_path(settings, batch, writer_id);

    // Never truncate: an existing artifact means a name collision, not a retry.
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => WriteError::Exists { path: path.clone() },
            _ => WriteError::Create {
                path: path.clone(),
                source,
            },
        })?;
    file.write_all(batch.bytes())
        .map_err(|source| WriteError::Write {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}

fn artifact_path(settings: &WriterSettings, batch: &Command, writer_id: u8) -> PathBuf {
    let name = artifact_name(&settings.prefix, settings.session_id, batch, writer_id);
    Path::new(&settings.output_dir).join(name)
}
