//! Script execution: temp file, command line, launch, cleanup.
//!
//! [`ScriptRunner::execute`] is the single entry point used by both SCM
//! operations. Every failure short of an interruption is reported to the
//! output sink and turned into the [`FAILED_EXIT_CODE`] sentinel.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::command_line::build_command_line;
use crate::error::ScmError;
use crate::launcher::{LaunchError, LaunchRequest, ProcessLauncher, TokioLauncher};
use crate::sink::OutputSink;
use crate::temp_script::{ScriptFile, TempFileFactory, WorkspaceTempFiles};

/// Shell used for scripts without an interpreter directive.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Prefix of the temporary script file name.
pub const DEFAULT_TEMP_PREFIX: &str = "SSSCM";

/// Extension of the temporary script file.
pub const DEFAULT_TEMP_SUFFIX: &str = ".sh";

/// Exit code returned when the script could not be written or launched.
pub const FAILED_EXIT_CODE: i32 = -1;

/// Host-level knobs of the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Shell invoked as `<shell> -xe <file>`.
    pub shell: String,
    pub temp_prefix: String,
    pub temp_suffix: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
        }
    }
}

/// Runs a script body in a working directory and reports its exit code.
#[derive(Debug, Clone)]
pub struct ScriptRunner<L = TokioLauncher, F = WorkspaceTempFiles> {
    settings: RunnerSettings,
    launcher: L,
    files: F,
}

impl ScriptRunner {
    /// Runner using real processes and real temp files.
    pub fn new(settings: RunnerSettings) -> Self {
        Self::with_parts(settings, TokioLauncher, WorkspaceTempFiles)
    }
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new(RunnerSettings::default())
    }
}

impl<L, F> ScriptRunner<L, F>
where
    L: ProcessLauncher,
    F: TempFileFactory,
{
    pub fn with_parts(settings: RunnerSettings, launcher: L, files: F) -> Self {
        Self {
            settings,
            launcher,
            files,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Execute `script` inside `working_dir`, streaming output to `sink`.
    ///
    /// Returns the process exit code, or [`FAILED_EXIT_CODE`] if the script
    /// file could not be created or the process could not be started. The
    /// temporary script file is removed before returning on every path,
    /// including interruption.
    pub async fn execute(
        &self,
        script: &str,
        working_dir: &Path,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<i32, ScmError> {
        let file = match self.files.create_text_file(
            working_dir,
            &self.settings.temp_prefix,
            &self.settings.temp_suffix,
            script,
        ) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(
                    working_dir = %working_dir.display(),
                    error = %e,
                    "Failed to write script file",
                );
                sink.fatal_error(&format!("Unable to produce a script file: {e}"));
                return Ok(FAILED_EXIT_CODE);
            }
        };

        let script_path = file.path().to_path_buf();
        tracing::debug!(script_path = %script_path.display(), "Script file written");

        let outcome = self
            .run_file(script, &script_path, working_dir, sink, cancel)
            .await;

        if let Err(e) = file.delete() {
            tracing::warn!(
                script_path = %script_path.display(),
                error = %e,
                "Failed to delete script file",
            );
            sink.fatal_error(&format!(
                "Unable to delete script file {}: {e}",
                script_path.display()
            ));
        }

        match &outcome {
            Ok(exit_code) => tracing::info!(exit_code, "Script finished"),
            Err(e) => tracing::warn!(error = %e, "Script did not finish"),
        }
        outcome
    }

    async fn run_file(
        &self,
        script: &str,
        script_path: &Path,
        working_dir: &Path,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<i32, ScmError> {
        let Some(script_path) = script_path.to_str() else {
            sink.fatal_error(&format!(
                "Command execution failed: script path {} is not valid UTF-8",
                script_path.display()
            ));
            return Ok(FAILED_EXIT_CODE);
        };

        let argv = match build_command_line(script, script_path, &self.settings.shell) {
            Ok(argv) => argv,
            Err(e) => {
                sink.fatal_error(&format!("Command execution failed: {e}"));
                return Ok(FAILED_EXIT_CODE);
            }
        };

        tracing::info!(argv = ?argv, working_dir = %working_dir.display(), "Running script");

        let request = LaunchRequest::new(argv, working_dir);
        match self.launcher.launch(&request, sink, cancel).await {
            Ok(exit_code) => Ok(exit_code),
            Err(LaunchError::Interrupted) => Err(ScmError::Interrupted),
            Err(e) => {
                sink.fatal_error(&format!("Command execution failed: {e}"));
                Ok(FAILED_EXIT_CODE)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
