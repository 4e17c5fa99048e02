use std::path::PathBuf;

use ssscm_core::descriptor::SHELL_SCRIPT_TYPE_NAME;
use ssscm_core::runner::{DEFAULT_SHELL, DEFAULT_TEMP_PREFIX, DEFAULT_TEMP_SUFFIX};
use ssscm_core::RunnerSettings;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Persisted job configuration. Only `checkout` and `poll` need it.
    pub config_path: Option<PathBuf>,
    /// Registry key of the SCM to build (default: `shell_script`).
    pub scm_type: String,
    /// Shell and temporary file naming used by the script runner.
    pub runner: RunnerSettings,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default        |
    /// |---------------------|----------------|
    /// | `SSSCM_CONFIG`      | --             |
    /// | `SSSCM_SCM_TYPE`    | `shell_script` |
    /// | `SSSCM_SHELL`       | `/bin/sh`      |
    /// | `SSSCM_TEMP_PREFIX` | `SSSCM`        |
    /// | `SSSCM_TEMP_SUFFIX` | `.sh`          |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WorkerConfig::from_env`] with an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config_path = var("SSSCM_CONFIG").map(PathBuf::from);
        let scm_type = var("SSSCM_SCM_TYPE").unwrap_or_else(|| SHELL_SCRIPT_TYPE_NAME.into());
        let runner = RunnerSettings {
            shell: var("SSSCM_SHELL").unwrap_or_else(|| DEFAULT_SHELL.into()),
            temp_prefix: var("SSSCM_TEMP_PREFIX").unwrap_or_else(|| DEFAULT_TEMP_PREFIX.into()),
            temp_suffix: var("SSSCM_TEMP_SUFFIX").unwrap_or_else(|| DEFAULT_TEMP_SUFFIX.into()),
        };

        Self {
            config_path,
            scm_type,
            runner,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
