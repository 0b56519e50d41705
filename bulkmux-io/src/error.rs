use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures inside a writer thread. These never reach the caller that
/// produced the batch; the worker logs them and keeps draining.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create bulk file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bulk file {} already exists, batch not written", path.display())]
    Exists { path: PathBuf },

    #[error("failed to write bulk file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write console line: {0}")]
    Console(#[from] io::Error),
}
