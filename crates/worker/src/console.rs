use std::io::{self, Stderr, Write};
use std::sync::Mutex;

use ssscm_core::sink::OutputSink;

/// Sink that prints script output and runner failures to one writer.
///
/// The binary uses [`ConsoleSink::stderr`], leaving stdout to the JSON
/// result line.
#[derive(Debug)]
pub struct ConsoleSink<W = Stderr> {
    writer: Mutex<W>,
}

impl ConsoleSink {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_line(&self, line: &str) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            tracing::debug!(error = %e, "Failed to write to console");
        }
    }
}

impl<W: Write + Send> OutputSink for ConsoleSink<W> {
    fn output(&self, line: &str) {
        self.write_line(line);
    }

    fn fatal_error(&self, message: &str) {
        tracing::error!(message, "Script runner failure");
        self.write_line(&format!("FATAL: {message}"));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
