//! SCM types the worker can build, keyed by type name.
//!
//! Each entry pairs a descriptor with a factory that turns the persisted job
//! configuration into a ready [`Scm`]. The shell script SCM is registered by
//! [`ScmRegistry::with_builtin`].

use std::collections::BTreeMap;

use ssscm_core::descriptor::{shell_script_descriptor, ScmDescriptor};
use ssscm_core::{RunnerSettings, Scm, ScriptScmConfig, ShellScriptScm};

use crate::error::WorkerError;

/// Builds an SCM from persisted configuration JSON.
pub type ScmFactory = fn(&str, RunnerSettings) -> Result<Box<dyn Scm>, WorkerError>;

struct Entry {
    descriptor: ScmDescriptor,
    factory: ScmFactory,
}

#[derive(Default)]
pub struct ScmRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl ScmRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the shell script SCM.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(shell_script_descriptor(), build_shell_script);
        registry
    }

    /// Add or replace the entry for `descriptor.type_name`.
    pub fn register(&mut self, descriptor: ScmDescriptor, factory: ScmFactory) {
        tracing::debug!(type_name = descriptor.type_name, "Registering SCM type");
        self.entries.insert(
            descriptor.type_name,
            Entry {
                descriptor,
                factory,
            },
        );
    }

    /// Descriptors of every registered type, ordered by type name.
    pub fn descriptors(&self) -> Vec<&ScmDescriptor> {
        self.entries.values().map(|e| &e.descriptor).collect()
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&ScmDescriptor> {
        self.entries.get(type_name).map(|e| &e.descriptor)
    }

    /// Build the SCM registered under `type_name`.
    pub fn build(
        &self,
        type_name: &str,
        config_json: &str,
        settings: RunnerSettings,
    ) -> Result<Box<dyn Scm>, WorkerError> {
        let entry = self
            .entries
            .get(type_name)
            .ok_or_else(|| WorkerError::UnknownScmType(type_name.to_string()))?;
        (entry.factory)(config_json, settings)
    }
}

fn build_shell_script(
    config_json: &str,
    settings: RunnerSettings,
) -> Result<Box<dyn Scm>, WorkerError> {
    let config = ScriptScmConfig::from_json(config_json)?;
    Ok(Box::new(ShellScriptScm::new(config, settings)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
