//! Error types for runner module

use thiserror::Error;

/// Failures that prevent a host tool process from producing an outcome at all.
///
/// A process that runs and exits non-zero, times out, or is killed is NOT an
/// error here; those are reported through [`ProcessOutput`](crate::ProcessOutput).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("program '{program}' was not found")]
    ProgramNotFound { program: String },

    #[error("failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("failed to wait for '{program}': {reason}")]
    WaitFailed { program: String, reason: String },

    #[error("{stream} pipe was not available for '{program}'")]
    PipeUnavailable {
        program: String,
        stream: &'static str,
    },
}
