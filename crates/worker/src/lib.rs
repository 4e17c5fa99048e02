//! `ssscm-worker` library crate.
//!
//! Host-side glue around `ssscm-core`: the SCM type registry, environment
//! configuration, the console sink and the command dispatcher. The binary
//! entrypoint lives in `main.rs`.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod registry;

pub use error::WorkerError;
