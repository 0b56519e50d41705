use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Where the log writer sends its lines.
#[derive(Debug, Clone, Default)]
pub enum ConsoleTarget {
    /// Process stdout (the interactive log).
    #[default]
    Stdout,
    /// In-memory capture, shared between clones.
    Buffer(SharedBuffer),
}

impl ConsoleTarget {
    /// Write one already-terminated line atomically with respect to other writers.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            ConsoleTarget::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
            ConsoleTarget::Buffer(buffer) => buffer.lock().write_all(line.as_bytes()),
        }
    }
}

/// A cloneable byte sink. Every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // Lines are appended in one call, so a poisoned buffer is still whole.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
