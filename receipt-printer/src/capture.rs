//! Debug capture of an output stream
//!
//! Wraps a sink and keeps a copy of every byte the sink accepted, so the
//! exact stream sent to a printer can be inspected or replayed later.

use std::io::{self, Write};
use std::path::Path;

use tracing::info;

/// Sink adapter that mirrors accepted bytes into memory
#[derive(Debug)]
pub struct CaptureSink<W: Write> {
    inner: W,
    captured: Vec<u8>,
}

impl<W: Write> CaptureSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            captured: Vec::new(),
        }
    }

    /// Bytes accepted by the inner sink so far
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Write the capture to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.captured)?;
        info!(path = %path.display(), bytes = self.captured.len(), "capture saved");
        Ok(())
    }

    /// Split into the inner sink and the capture
    pub fn into_parts(self) -> (W, Vec<u8>) {
        (self.inner, self.captured)
    }
}

impl<W: Write> Write for CaptureSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
