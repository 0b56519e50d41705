use std::fs;
use std::path::PathBuf;

use bulkmux_io::ConsoleTarget;
use serde::{Deserialize, Serialize};

use crate::error::BulkError;

pub const ENV_OUTPUT_DIR: &str = "BULKMUX_OUTPUT_DIR";
pub const ENV_LOG_PREFIX: &str = "BULKMUX_LOG_PREFIX";

const DEFAULT_LOG_PREFIX: &str = "bulk";

/// Registry-wide settings shared by every session it opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Directory receiving `bulk_<id>_<ns>_<writer>.log` files.
    pub output_dir: PathBuf,
    /// Stem of log tags and file names.
    pub log_prefix: String,
    /// Destination of the interactive log. Not serializable; always Stdout when loaded.
    #[serde(skip)]
    pub console: ConsoleTarget,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            console: ConsoleTarget::Stdout,
        }
    }
}

impl BulkConfig {
    /// Defaults, overridden by `BULKMUX_OUTPUT_DIR` / `BULKMUX_LOG_PREFIX` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                config.output_dir = PathBuf::from(dir);
            }
        }

        if let Ok(prefix) = std::env::var(ENV_LOG_PREFIX) {
            let prefix = prefix.trim();
            if !prefix.is_empty() {
                config.log_prefix = prefix.to_string();
            }
        }

        config
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_console(mut self, console: ConsoleTarget) -> Self {
        self.console = console;
        self
    }

    /// Make sure the output directory exists.
    pub fn prepare(&self) -> Result<(), BulkError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| BulkError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })
    }
}
