/// Errors that escape an SCM operation.
///
/// Script creation, launch and cleanup failures never surface here: they are
/// written to the output sink and folded into the `-1` exit code. Only an
/// interruption of the blocked wait is handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error("Script execution was interrupted")]
    Interrupted,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
