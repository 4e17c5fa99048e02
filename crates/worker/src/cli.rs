//! Command-line commands and their dispatch.
//!
//! ```text
//! ssscm-worker checkout <workspace>
//! ssscm-worker poll <workspace>
//! ssscm-worker describe
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use ssscm_core::config::ConfigError;
use ssscm_core::descriptor::ScmDescriptor;
use ssscm_core::sink::OutputSink;
use ssscm_core::Scm;

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::registry::ScmRegistry;

pub const USAGE: &str = "usage: ssscm-worker <checkout|poll> <workspace> | ssscm-worker describe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Checkout { workspace: PathBuf },
    Poll { workspace: PathBuf },
    Describe,
}

impl Command {
    /// Parse the arguments that follow the program name.
    pub fn parse<I>(args: I) -> Result<Self, WorkerError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args.next().ok_or_else(|| usage("missing command"))?;

        let command = match name.as_str() {
            "checkout" | "poll" => {
                let workspace = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| usage(&format!("'{name}' needs a workspace directory")))?;
                if name == "checkout" {
                    Self::Checkout { workspace }
                } else {
                    Self::Poll { workspace }
                }
            }
            "describe" => Self::Describe,
            other => return Err(usage(&format!("unknown command '{other}'"))),
        };

        if let Some(extra) = args.next() {
            return Err(usage(&format!("unexpected argument '{extra}'")));
        }
        Ok(command)
    }
}

fn usage(problem: &str) -> WorkerError {
    WorkerError::Usage(format!("{problem}\n{USAGE}"))
}

/// Result of a dispatched command, printed as JSON by the binary.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    CheckedOut { checked_out: bool },
    Polled { has_changes: bool },
    Described { scm_types: Vec<ScmDescriptor> },
}

/// Run `command` against the SCM selected by `config`.
pub async fn run(
    command: &Command,
    config: &WorkerConfig,
    registry: &ScmRegistry,
    sink: &dyn OutputSink,
    cancel: &CancellationToken,
) -> Result<Outcome, WorkerError> {
    match command {
        Command::Describe => Ok(Outcome::Described {
            scm_types: registry.descriptors().into_iter().cloned().collect(),
        }),
        Command::Checkout { workspace } => {
            let scm = build_scm(config, registry)?;
            tracing::info!(workspace = %workspace.display(), "Running checkout");
            let checked_out = scm.checkout(workspace, sink, cancel).await?;
            Ok(Outcome::CheckedOut { checked_out })
        }
        Command::Poll { workspace } => {
            let scm = build_scm(config, registry)?;
            tracing::info!(workspace = %workspace.display(), "Polling for changes");
            let has_changes = scm.poll_for_changes(workspace, sink, cancel).await?;
            Ok(Outcome::Polled { has_changes })
        }
    }
}

fn build_scm(config: &WorkerConfig, registry: &ScmRegistry) -> Result<Box<dyn Scm>, WorkerError> {
    let path = config
        .config_path
        .as_deref()
        .ok_or(WorkerError::MissingEnv("SSSCM_CONFIG"))?;
    let json = read_config(path)?;
    registry.build(&config.scm_type, &json, config.runner.clone())
}

fn read_config(path: &Path) -> Result<String, WorkerError> {
    std::fs::read_to_string(path).map_err(|source| {
        WorkerError::Config(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
