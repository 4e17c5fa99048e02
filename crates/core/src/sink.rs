//! Destinations for script output and diagnostics.
//!
//! The runner writes the child's stdout and stderr here line by line, and
//! reports its own failures (script file creation, launch, cleanup) through
//! [`OutputSink::fatal_error`].

use std::sync::Mutex;

/// Append-only consumer of process output and diagnostic messages.
pub trait OutputSink: Send + Sync {
    /// A line produced by the child process, without its line terminator.
    fn output(&self, line: &str);

    /// A human-readable failure raised by the runner itself.
    fn fatal_error(&self, message: &str);
}

/// One entry recorded by [`CapturedOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkLine {
    Output(String),
    FatalError(String),
}

/// In-memory sink that keeps everything it receives, in order.
#[derive(Debug, Default)]
pub struct CapturedOutput {
    lines: Mutex<Vec<SinkLine>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry received so far.
    pub fn lines(&self) -> Vec<SinkLine> {
        self.lock().clone()
    }

    /// Process output lines only.
    pub fn output_lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|line| match line {
                SinkLine::Output(text) => Some(text.clone()),
                SinkLine::FatalError(_) => None,
            })
            .collect()
    }

    /// Runner diagnostics only.
    pub fn fatal_errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|line| match line {
                SinkLine::FatalError(text) => Some(text.clone()),
                SinkLine::Output(_) => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkLine>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputSink for CapturedOutput {
    fn output(&self, line: &str) {
        self.lock().push(SinkLine::Output(line.to_string()));
    }

    fn fatal_error(&self, message: &str) {
        self.lock().push(SinkLine::FatalError(message.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
