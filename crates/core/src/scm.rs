//! The SCM facade the build host drives.
//!
//! Checkout runs the checkout script and always reports success. Polling
//! runs the selected script and reports pending changes only on exit code
//! `1`; every other code, including the `-1` failure sentinel, means
//! "no changes". Nothing is remembered between calls.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::ScriptScmConfig;
use crate::descriptor::{shell_script_descriptor, ScmDescriptor};
use crate::error::ScmError;
use crate::launcher::{ProcessLauncher, TokioLauncher};
use crate::runner::{RunnerSettings, ScriptRunner};
use crate::sink::OutputSink;
use crate::temp_script::{TempFileFactory, WorkspaceTempFiles};

/// Exit code with which a polling script signals pending changes.
pub const CHANGES_PENDING_EXIT_CODE: i32 = 1;

/// Whether a polling exit code means a new checkout is warranted.
pub fn has_changes(exit_code: i32) -> bool {
    exit_code == CHANGES_PENDING_EXIT_CODE
}

/// Operations the build host invokes on a configured SCM.
#[async_trait]
pub trait Scm: Send + Sync {
    fn descriptor(&self) -> ScmDescriptor;

    /// Materialize the workspace. `Ok(true)` means the build may proceed.
    async fn checkout(
        &self,
        workspace: &Path,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<bool, ScmError>;

    /// Decide whether a new checkout is warranted.
    async fn poll_for_changes(
        &self,
        workspace: &Path,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<bool, ScmError>;
}

/// SCM whose checkout and polling are user-supplied shell scripts.
#[derive(Debug, Clone)]
pub struct ShellScriptScm<L = TokioLauncher, F = WorkspaceTempFiles> {
    config: ScriptScmConfig,
    runner: ScriptRunner<L, F>,
}

impl ShellScriptScm {
    pub fn new(config: ScriptScmConfig, settings: RunnerSettings) -> Self {
        Self::with_runner(config, ScriptRunner::new(settings))
    }
}

impl<L, F> ShellScriptScm<L, F>
where
    L: ProcessLauncher,
    F: TempFileFactory,
{
    pub fn with_runner(config: ScriptScmConfig, runner: ScriptRunner<L, F>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &ScriptScmConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect from the next operation.
    pub fn reconfigure(&mut self, config: ScriptScmConfig) {
        self.config = config;
    }

    pub fn runner(&self) -> &ScriptRunner<L, F> {
        &self.runner
    }
}

#[async_trait]
impl<L, F> Scm for ShellScriptScm<L, F>
where
    L: ProcessLauncher + 'static,
    F: TempFileFactory + 'static,
{
    fn descriptor(&self) -> ScmDescriptor {
        shell_script_descriptor()
    }

    async fn checkout(
        &self,
        workspace: &Path,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<bool, ScmError> {
        let exit_code = self
            .runner
            .execute(&self.config.checkout_script, workspace, sink, cancel)
            .await?;

        // The build proceeds whatever the checkout script returned.
        if exit_code != 0 {
            tracing::warn!(exit_code, "Checkout script failed; reporting checkout as done");
        }
        Ok(true)
    }

    async fn poll_for_changes(
        &self,
        workspace: &Path,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<bool, ScmError> {
        let script = self.config.polling_script_to_run();
        let exit_code = self.runner.execute(script, workspace, sink, cancel).await?;
        let changes = has_changes(exit_code);

        tracing::info!(
            exit_code,
            has_changes = changes,
            use_checkout_for_polling = self.config.use_checkout_for_polling,
            "Polling finished",
        );
        Ok(changes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::launcher::{LaunchError, LaunchRequest};
    use crate::sink::CapturedOutput;

    /// How [`ScriptedLauncher`] answers a launch.
    #[derive(Clone, Copy)]
    enum Reply {
        Exit(i32),
        Interrupt,
    }

    /// Launcher that reads the script file it was asked to run and answers
    /// with a fixed reply.
    struct ScriptedLauncher {
        reply: Reply,
        scripts_seen: Mutex<Vec<String>>,
    }

    impl ProcessLauncher for ScriptedLauncher {
        async fn launch(
            &self,
            request: &LaunchRequest,
            _sink: &dyn OutputSink,
            _cancel: &CancellationToken,
        ) -> Result<i32, LaunchError> {
            let path = request.argv.last().ok_or(LaunchError::EmptyCommandLine)?;
            let contents = std::fs::read_to_string(path)?;
            self.scripts_seen.lock().expect("lock").push(contents);
            match self.reply {
                Reply::Exit(code) => Ok(code),
                Reply::Interrupt => Err(LaunchError::Interrupted),
            }
        }
    }

    fn scm_replying(config: ScriptScmConfig, reply: Reply) -> ShellScriptScm<ScriptedLauncher> {
        ShellScriptScm::with_runner(
            config,
            ScriptRunner::with_parts(
                RunnerSettings::default(),
                ScriptedLauncher {
                    reply,
                    scripts_seen: Mutex::new(Vec::new()),
                },
                WorkspaceTempFiles,
            ),
        )
    }

    fn scm(config: ScriptScmConfig, exit_code: i32) -> ShellScriptScm<ScriptedLauncher> {
        scm_replying(config, Reply::Exit(exit_code))
    }

    fn scripts_seen(scm: &ShellScriptScm<ScriptedLauncher>) -> Vec<String> {
        scm.runner()
            .launcher()
            .scripts_seen
            .lock()
            .expect("lock")
            .clone()
    }

    #[test]
    fn exit_code_convention() {
        assert!(has_changes(1));
        for code in [0, 2, 127, 255, -1] {
            assert!(!has_changes(code), "exit code {code}");
        }
    }

    #[tokio::test]
    async fn poll_reports_changes_only_for_exit_one() {
        let dir = tempfile::tempdir().expect("create temp dir");
        for (code, expected) in [(1, true), (0, false), (2, false), (127, false), (-1, false)] {
            let scm = scm(ScriptScmConfig::new("checkout", "poll"), code);
            let changes = scm
                .poll_for_changes(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
                .await
                .expect("poll");
            assert_eq!(changes, expected, "exit code {code}");
        }
    }

    #[tokio::test]
    async fn poll_uses_polling_script_by_default() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let scm = scm(ScriptScmConfig::new("echo checkout", "echo poll"), 0);
        scm.poll_for_changes(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await
            .expect("poll");
        assert_eq!(scripts_seen(&scm), vec!["echo poll"]);
    }

    #[tokio::test]
    async fn poll_uses_checkout_script_when_selected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config =
            ScriptScmConfig::new("echo checkout", "echo poll").with_checkout_for_polling(true);
        let scm = scm(config, 1);
        let changes = scm
            .poll_for_changes(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await
            .expect("poll");
        assert!(changes);
        assert_eq!(scripts_seen(&scm), vec!["echo checkout"]);
    }

    #[tokio::test]
    async fn checkout_succeeds_regardless_of_exit_code() {
        let dir = tempfile::tempdir().expect("create temp dir");
        for code in [0, 1, 2, 127, -1] {
            let scm = scm(ScriptScmConfig::new("echo checkout", "echo poll"), code);
            let ok = scm
                .checkout(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
                .await
                .expect("checkout");
            assert!(ok, "exit code {code}");
            assert_eq!(scripts_seen(&scm), vec!["echo checkout"]);
        }
    }

    #[tokio::test]
    async fn interruption_is_not_swallowed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let scm = scm_replying(ScriptScmConfig::new("sleep 30", "sleep 30"), Reply::Interrupt);

        let checkout = scm
            .checkout(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await;
        assert_matches!(checkout, Err(ScmError::Interrupted));

        let poll = scm
            .poll_for_changes(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await;
        assert_matches!(poll, Err(ScmError::Interrupted));
    }

    #[tokio::test]
    async fn reconfigure_takes_effect_on_next_call() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut scm = scm(ScriptScmConfig::new("first", "first"), 0);
        scm.reconfigure(ScriptScmConfig::new("second", "second"));
        scm.checkout(dir.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await
            .expect("checkout");
        assert_eq!(scm.config().checkout_script, "second");
        assert_eq!(scripts_seen(&scm), vec!["second"]);
    }

    #[test]
    fn descriptor_is_available_through_trait_object() {
        let scm: Box<dyn Scm> = Box::new(ShellScriptScm::new(
            ScriptScmConfig::default(),
            RunnerSettings::default(),
        ));
        assert_eq!(scm.descriptor().display_name, "Shell Script");
    }
}
