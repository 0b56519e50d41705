pub mod blocks;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod session;

// Re-export the main struct so users can just use `bulkmux_core::SessionRegistry`
pub use registry::SessionRegistry;

pub use blocks::{Batcher, DepthTracker, TrackerEvent};
pub use config::BulkConfig;
pub use error::BulkError;
pub use pipeline::Pipeline;
pub use session::{Session, SessionId};

// The leaf types callers need alongside the registry.
pub use bulkmux_io::{Command, ConsoleTarget, SharedBuffer};

/// Status returned by the boundary operations. The discriminants are the
/// byte codes exposed to foreign callers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok = 0,
    ContextNotFound = 1,
}

impl Status {
    pub fn as_code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}
