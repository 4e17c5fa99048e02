//! Job-level configuration of the shell script SCM.
//!
//! The configuration is three values owned by the job definition. It can be
//! persisted as a small versioned JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "checkout_script": "git pull",
//!   "polling_script": "test -f .dirty && exit 1",
//!   "use_checkout_for_polling": false
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current version of the persisted configuration format.
pub const CONFIG_VERSION: u32 = 1;

/// Scripts run for checkout and polling.
///
/// The scripts are free-form text and are never validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptScmConfig {
    /// Script run on checkout.
    pub checkout_script: String,
    /// Script run on polling unless `use_checkout_for_polling` is set.
    pub polling_script: String,
    /// Run the checkout script when polling instead of the polling script.
    #[serde(default)]
    pub use_checkout_for_polling: bool,
}

impl ScriptScmConfig {
    /// Configuration with separate checkout and polling scripts.
    pub fn new(checkout_script: impl Into<String>, polling_script: impl Into<String>) -> Self {
        Self {
            checkout_script: checkout_script.into(),
            polling_script: polling_script.into(),
            use_checkout_for_polling: false,
        }
    }

    pub fn with_checkout_for_polling(mut self, use_checkout_for_polling: bool) -> Self {
        self.use_checkout_for_polling = use_checkout_for_polling;
        self
    }

    /// The script a polling run executes.
    pub fn polling_script_to_run(&self) -> &str {
        if self.use_checkout_for_polling {
            &self.checkout_script
        } else {
            &self.polling_script
        }
    }

    /// Serialize into the versioned JSON format.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        let persisted = PersistedConfig {
            version: CONFIG_VERSION,
            config: self.clone(),
        };
        Ok(serde_json::to_string_pretty(&persisted)?)
    }

    /// Parse the versioned JSON format.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let header: VersionHeader = serde_json::from_str(json)?;
        if header.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(header.version));
        }
        let persisted: PersistedConfig = serde_json::from_str(json)?;
        Ok(persisted.config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedConfig {
    version: u32,
    #[serde(flatten)]
    config: ScriptScmConfig,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration version {0}")]
    UnsupportedVersion(u32),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
