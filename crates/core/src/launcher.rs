//! Child process launching.
//!
//! [`ProcessLauncher`] is the seam between the runner and the operating
//! system. [`TokioLauncher`] spawns the command with `tokio::process`,
//! forwards stdout and stderr to the sink line by line as they are produced
//! and waits for the exit status. Once the process exits, leftover output
//! is read for a short grace period only.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::{pin, Pin};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::sink::OutputSink;

/// Exit code reported when the process produced none (killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// How long output is still read once the process has exited.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Everything needed to start one child process.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Working directory of the child.
    pub cwd: PathBuf,
    /// Complete environment of the child.
    pub env: Vec<(OsString, OsString)>,
}

impl LaunchRequest {
    /// Request that runs `argv` in `cwd` with the current process environment.
    pub fn new(argv: Vec<String>, cwd: &Path) -> Self {
        Self {
            argv,
            cwd: cwd.to_path_buf(),
            env: std::env::vars_os().collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Empty command line")]
    EmptyCommandLine,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Interrupted while waiting for the process")]
    Interrupted,
}

/// Starts a process, streams its output and waits for it to finish.
pub trait ProcessLauncher: Send + Sync {
    /// Run `request` to completion and return its exit code.
    ///
    /// Returns [`LaunchError::Interrupted`] if `cancel` fires before the
    /// process exits; the process is killed in that case.
    fn launch(
        &self,
        request: &LaunchRequest,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<i32, LaunchError>> + Send;
}

/// Launcher backed by [`tokio::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    async fn launch(
        &self,
        request: &LaunchRequest,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<i32, LaunchError> {
        let (program, args) = request
            .argv
            .split_first()
            .ok_or(LaunchError::EmptyCommandLine)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&request.cwd)
            .env_clear()
            .envs(request.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(argv = ?request.argv, cwd = %request.cwd.display(), "Spawning script process");

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

        let run = async {
            let mut forward = pin!(forward_output(stdout, stderr, sink));
            tokio::select! {
                copied = &mut forward => {
                    copied?;
                    child.wait().await
                }
                status = child.wait() => {
                    let status = status?;
                    drain_after_exit(forward).await;
                    Ok(status)
                }
            }
        };

        let finished = tokio::select! {
            _ = cancel.cancelled() => None,
            status = run => Some(status),
        };

        match finished {
            Some(status) => Ok(exit_code(status?)),
            None => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill interrupted script process");
                }
                Err(LaunchError::Interrupted)
            }
        }
    }
}

/// Read what the exited process left in its pipes, for at most
/// [`OUTPUT_DRAIN_GRACE`]. Background children of the script may keep the
/// pipes open indefinitely.
async fn drain_after_exit<F>(forward: Pin<&mut F>)
where
    F: Future<Output = io::Result<()>>,
{
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, forward).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to read remaining script output"),
        Err(_) => tracing::warn!(
            grace_ms = OUTPUT_DRAIN_GRACE.as_millis() as u64,
            "Script exited but its output is still open; no longer reading it",
        ),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(NO_EXIT_CODE)
}

/// Copy both streams to the sink until each reaches end of file.
async fn forward_output<O, E>(stdout: O, stderr: E, sink: &dyn OutputSink) -> io::Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = BufReader::new(stdout);
    let mut stderr = BufReader::new(stderr);
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = stdout.read_until(b'\n', &mut out_buf), if out_open => {
                out_open = read? > 0;
                emit_line(&mut out_buf, sink);
            }
            read = stderr.read_until(b'\n', &mut err_buf), if err_open => {
                err_open = read? > 0;
                emit_line(&mut err_buf, sink);
            }
        }
    }

    Ok(())
}

/// Send the buffered line (if any) to the sink and reset the buffer.
fn emit_line(buf: &mut Vec<u8>, sink: &dyn OutputSink) {
    if buf.is_empty() {
        return;
    }
    {
        let text = String::from_utf8_lossy(buf);
        sink.output(text.trim_end_matches(|c: char| c == '\n' || c == '\r'));
    }
    buf.clear();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
