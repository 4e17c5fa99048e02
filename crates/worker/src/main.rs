//! `ssscm-worker` -- runs shell script SCM operations for a CI host.
//!
//! Loads the job's persisted SCM configuration, builds the SCM through the
//! registry and runs `checkout` or `poll` against a workspace directory.
//! Script output, runner failures and logs go to stderr. The command result
//! is the only thing printed to stdout, as one JSON line.
//!
//! # Environment variables
//!
//! | Variable            | Required            | Default        | Description                         |
//! |---------------------|---------------------|----------------|-------------------------------------|
//! | `SSSCM_CONFIG`      | for checkout / poll | --             | Persisted job configuration (JSON)  |
//! | `SSSCM_SCM_TYPE`    | no                  | `shell_script` | Registry key of the SCM             |
//! | `SSSCM_SHELL`       | no                  | `/bin/sh`      | Shell for scripts without `#!`      |
//! | `SSSCM_TEMP_PREFIX` | no                  | `SSSCM`        | Script file name prefix             |
//! | `SSSCM_TEMP_SUFFIX` | no                  | `.sh`          | Script file name suffix             |
//!
//! # Exit codes
//!
//! `0` when the command ran (whatever the script returned), `1` on worker
//! errors, `2` on bad usage and `130` when interrupted with Ctrl-C.

use std::process::ExitCode;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssscm_worker::cli::{self, Command};
use ssscm_worker::config::WorkerConfig;
use ssscm_worker::console::ConsoleSink;
use ssscm_worker::registry::ScmRegistry;
use ssscm_worker::WorkerError;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssscm_worker=info,ssscm_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Worker failed");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let config = WorkerConfig::from_env();
    tracing::info!(
        scm_type = %config.scm_type,
        shell = %config.runner.shell,
        command = ?command,
        "Starting ssscm-worker",
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let registry = ScmRegistry::with_builtin();
    let sink = ConsoleSink::stderr();
    let outcome = match cli::run(&command, &config, &registry, &sink, &cancel).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_interrupted() => {
            tracing::warn!("Interrupted");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
        Err(e @ WorkerError::Usage(_)) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
        Err(e) => return Err(e).context("command failed"),
    };

    let json = serde_json::to_string(&outcome).context("failed to encode result")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

/// Cancel `token` on the first Ctrl-C.
fn spawn_interrupt_listener(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping script");
                token.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Unable to listen for Ctrl-C"),
        }
    });
}
