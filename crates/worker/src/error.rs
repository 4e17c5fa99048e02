use ssscm_core::config::ConfigError;
use ssscm_core::ScmError;

/// Failures of the worker outside the script's own exit status.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Unknown SCM type '{0}'")]
    UnknownScmType(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Usage(String),

    #[error("{0} environment variable is required")]
    MissingEnv(&'static str),

    #[error(transparent)]
    Scm(#[from] ScmError),
}

impl WorkerError {
    /// Whether the run was cut short by an interruption request.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Scm(ScmError::Interrupted))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
