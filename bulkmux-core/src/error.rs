use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BulkError {
    #[error("bulk size must be at least 1")]
    ZeroPoolSize,

    #[error("failed to spawn writer thread: {0}")]
    SpawnWorker(#[source] io::Error),

    #[error("failed to prepare output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
