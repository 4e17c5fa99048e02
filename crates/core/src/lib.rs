//! Shell script SCM: checkout and change polling driven by user scripts.
//!
//! A job supplies a checkout script and a polling script. Each operation
//! writes the script to a temporary file in the workspace, runs it through
//! `/bin/sh -xe` (or the interpreter named on a `#!` first line), streams
//! its output to an [`sink::OutputSink`] and interprets the exit code.
//! Polling reports pending changes only when the script exits with `1`.

pub mod command_line;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod launcher;
pub mod runner;
pub mod scm;
pub mod sink;
pub mod temp_script;

pub use config::ScriptScmConfig;
pub use error::ScmError;
pub use runner::{RunnerSettings, ScriptRunner};
pub use scm::{Scm, ShellScriptScm};
