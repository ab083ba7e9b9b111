use crate::error::RunnerError;
use std::time::Duration;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - host tool execution interface
// ============================================================================

/// Output from one host tool process.
///
/// `stdout`/`stderr` hold at most the runner's capture limit (the tail end of
/// the stream); `*_bytes` count everything the process wrote.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub stdout_bytes: usize,
    pub stderr_bytes: usize,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
    /// Terminating signal, if the process did not exit normally
    pub signal: Option<i32>,
    /// The hard timeout expired and termination was initiated
    pub timed_out: bool,
    /// Graceful termination did not finish within the grace period
    pub force_killed: bool,
    /// Wall-clock time from spawn to reap
    pub duration: Duration,
}

impl ProcessOutput {
    /// Output of a process that ran to completion with `exit_code`.
    #[must_use]
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stdout = stdout.into();
        let stderr = stderr.into();
        Self {
            stdout_bytes: stdout.len(),
            stderr_bytes: stderr.len(),
            stdout,
            stderr,
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    /// Output of a process that hit its timeout and exited during the grace period.
    #[must_use]
    pub fn timed_out(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            signal: Some(15),
            timed_out: true,
            ..Self::exited(0, stdout, stderr)
        }
        .without_exit_code()
    }

    /// Output of a process that had to be force-killed after its timeout.
    #[must_use]
    pub fn force_killed(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            signal: Some(9),
            timed_out: true,
            force_killed: true,
            ..Self::exited(0, stdout, stderr)
        }
        .without_exit_code()
    }

    /// Output of a process killed by `signal` before any timeout expired.
    #[must_use]
    pub fn signaled(signal: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            signal: Some(signal),
            ..Self::exited(0, stdout, stderr)
        }
        .without_exit_code()
    }

    fn without_exit_code(mut self) -> Self {
        self.exit_code = None;
        self
    }

    /// Exited on its own with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    /// stdout and stderr joined with a newline, for marker inspection.
    #[must_use]
    pub fn merged_text(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Trait for host tool process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation)
/// and MUST return within `timeout` plus a bounded termination grace period.
/// Timeouts and signals are reported through [`ProcessOutput`]; `Err` is
/// reserved for failures where no process ran to observe.
///
/// `ProcessRunner` is a synchronous interface. Only one process is live at a
/// time per caller.
pub trait ProcessRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for &T {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}
