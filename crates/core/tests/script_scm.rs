//! End-to-end tests running real scripts through `/bin/sh`.
//!
//! Every test uses its own temporary workspace and inspects it afterwards
//! to verify the script file was removed.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use tokio_util::sync::CancellationToken;

use ssscm_core::runner::FAILED_EXIT_CODE;
use ssscm_core::sink::CapturedOutput;
use ssscm_core::{RunnerSettings, Scm, ScmError, ScriptRunner, ScriptScmConfig, ShellScriptScm};

fn leftover_scripts(workspace: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(workspace)
        .expect("read workspace")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("SSSCM"))
        })
        .collect()
}

async fn poll(script: &str, workspace: &Path) -> bool {
    let scm = ShellScriptScm::new(
        ScriptScmConfig::new("exit 0", script),
        RunnerSettings::default(),
    );
    scm.poll_for_changes(workspace, &CapturedOutput::new(), &CancellationToken::new())
        .await
        .expect("poll")
}

// ---------------------------------------------------------------------------
// Polling exit-code convention
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exit_one_means_changes() {
    let workspace = tempfile::tempdir().expect("create workspace");
    assert!(poll("exit 1", workspace.path()).await);
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn exit_zero_means_no_changes() {
    let workspace = tempfile::tempdir().expect("create workspace");
    assert!(!poll("exit 0", workspace.path()).await);
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn other_exit_codes_mean_no_changes() {
    let workspace = tempfile::tempdir().expect("create workspace");
    for script in ["exit 2", "exit 127", "exit 255", "no-such-command-ssscm"] {
        assert!(!poll(script, workspace.path()).await, "script {script:?}");
    }
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn failing_command_under_errexit_means_changes() {
    let workspace = tempfile::tempdir().expect("create workspace");
    assert!(poll("false\necho unreachable\n", workspace.path()).await);
}

#[tokio::test]
async fn background_job_does_not_delay_poll() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let started = Instant::now();
    assert!(poll("sleep 10 &\nexit 1\n", workspace.path()).await);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "took {:?}",
        started.elapsed()
    );
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn launch_failure_means_no_changes() {
    let workspace = tempfile::tempdir().expect("create workspace");
    assert!(!poll("#!/nonexistent/interpreter\nexit 1\n", workspace.path()).await);
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn checkout_script_used_for_polling_when_selected() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let config = ScriptScmConfig::new("exit 1", "exit 0").with_checkout_for_polling(true);
    let scm = ShellScriptScm::new(config, RunnerSettings::default());

    let changes = scm
        .poll_for_changes(workspace.path(), &CapturedOutput::new(), &CancellationToken::new())
        .await
        .expect("poll");
    assert!(changes);
}

#[tokio::test]
async fn polling_is_stateless() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let scm = ShellScriptScm::new(
        ScriptScmConfig::new("true", "echo run >> polls.log\nexit 1\n"),
        RunnerSettings::default(),
    );

    for _ in 0..3 {
        let changes = scm
            .poll_for_changes(workspace.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await
            .expect("poll");
        assert!(changes);
    }

    let log = std::fs::read_to_string(workspace.path().join("polls.log")).expect("read log");
    assert_eq!(log.lines().count(), 3);
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checkout_always_reports_success() {
    let workspace = tempfile::tempdir().expect("create workspace");
    for script in ["exit 0", "exit 3", "#!/nonexistent/interpreter\n"] {
        let scm = ShellScriptScm::new(
            ScriptScmConfig::new(script, "exit 1"),
            RunnerSettings::default(),
        );
        let ok = scm
            .checkout(workspace.path(), &CapturedOutput::new(), &CancellationToken::new())
            .await
            .expect("checkout");
        assert!(ok, "script {script:?}");
    }
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn checkout_runs_in_workspace() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let scm = ShellScriptScm::new(
        ScriptScmConfig::new("echo fetched > source.txt", "exit 0"),
        RunnerSettings::default(),
    );

    scm.checkout(workspace.path(), &CapturedOutput::new(), &CancellationToken::new())
        .await
        .expect("checkout");

    let contents =
        std::fs::read_to_string(workspace.path().join("source.txt")).expect("read output");
    assert_eq!(contents.trim(), "fetched");
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shell_traces_commands_to_sink() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let sink = CapturedOutput::new();

    let code = ScriptRunner::default()
        .execute(
            "echo hello-from-script\n",
            workspace.path(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("execute");

    assert_eq!(code, 0);
    let lines = sink.output_lines();
    assert!(
        lines.iter().any(|l| l.contains("+ echo hello-from-script")),
        "expected -x trace in {lines:?}"
    );
    assert!(lines.contains(&"hello-from-script".to_string()));
}

#[tokio::test]
async fn shell_stops_at_first_failing_command() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let sink = CapturedOutput::new();

    let code = ScriptRunner::default()
        .execute(
            "false\necho unreachable\n",
            workspace.path(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("execute");

    assert_eq!(code, 1);
    assert!(!sink.output_lines().contains(&"unreachable".to_string()));
}

#[tokio::test]
async fn echo_directive_receives_script_path() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let sink = CapturedOutput::new();

    let code = ScriptRunner::default()
        .execute(
            "#!/bin/echo hello\n",
            workspace.path(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("execute");

    assert_eq!(code, 0);
    let lines = sink.output_lines();
    assert_eq!(lines.len(), 1, "lines {lines:?}");
    let (word, path) = lines[0].split_once(' ').expect("two words");
    assert_eq!(word, "hello");
    let path = Path::new(path);
    assert_eq!(path.parent(), Some(workspace.path()));
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("SSSCM") && n.ends_with(".sh")));
    assert!(!path.exists());
}

#[tokio::test]
async fn empty_script_exits_zero() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let code = ScriptRunner::default()
        .execute("", workspace.path(), &CapturedOutput::new(), &CancellationToken::new())
        .await
        .expect("execute");
    assert_eq!(code, 0);
}

#[tokio::test]
async fn missing_workspace_fails_without_launch() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let missing = workspace.path().join("gone");
    let sink = CapturedOutput::new();

    let code = ScriptRunner::default()
        .execute("touch launched\n", &missing, &sink, &CancellationToken::new())
        .await
        .expect("execute");

    assert_eq!(code, FAILED_EXIT_CODE);
    assert!(sink.output_lines().is_empty());
    assert!(sink.fatal_errors()[0].starts_with("Unable to produce a script file"));
    assert!(!workspace.path().join("launched").exists());
}

#[tokio::test]
async fn space_after_marker_fails_launch() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let sink = CapturedOutput::new();

    let code = ScriptRunner::default()
        .execute(
            "#! /bin/sh\nexit 1\n",
            workspace.path(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("execute");

    assert_eq!(code, FAILED_EXIT_CODE);
    assert!(sink.fatal_errors()[0].starts_with("Command execution failed"));
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn hash_words_reach_the_interpreter() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let sink = CapturedOutput::new();

    ScriptRunner::default()
        .execute(
            "#!/bin/echo #x\n",
            workspace.path(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("execute");

    let lines = sink.output_lines();
    assert_eq!(lines.len(), 1, "lines {lines:?}");
    assert!(lines[0].starts_with("#x "), "lines {lines:?}");
}

#[tokio::test]
async fn missing_interpreter_reports_and_cleans_up() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let sink = CapturedOutput::new();

    let code = ScriptRunner::default()
        .execute(
            "#!/nonexistent/interpreter -v\n",
            workspace.path(),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .expect("execute");

    assert_eq!(code, FAILED_EXIT_CODE);
    assert!(sink.fatal_errors()[0].starts_with("Command execution failed"));
    assert!(leftover_scripts(workspace.path()).is_empty());
}

#[tokio::test]
async fn interruption_kills_script_and_cleans_up() {
    let workspace = tempfile::tempdir().expect("create workspace");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let scm = ShellScriptScm::new(
        ScriptScmConfig::new("exit 0", "sleep 30\nexit 1\n"),
        RunnerSettings::default(),
    );
    let result = scm
        .poll_for_changes(workspace.path(), &CapturedOutput::new(), &cancel)
        .await;

    assert_matches!(result, Err(ScmError::Interrupted));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(leftover_scripts(workspace.path()).is_empty());
}
