//! Test support utilities shared across Trellis test suites.
//!
//! Gated behind the `test-support` feature so downstream crates can pull
//! these helpers into their dev-dependencies without shipping them in
//! release builds.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::console::LogSink;

/// An in-memory [`LogSink`] target that tests can read back.
///
/// Cloning shares the underlying buffer, so keep one clone for
/// assertions and hand the other to [`CaptureSink::sink`].
#[derive(Clone, Debug, Default)]
pub struct CaptureSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    /// Creates an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a clone of this capture buffer as a [`LogSink`].
    #[must_use]
    pub fn sink(&self) -> LogSink {
        Arc::new(Mutex::new(self.clone()))
    }

    /// Returns everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        let buffer = self
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Returns the captured output split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(ToOwned::to_owned).collect()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
