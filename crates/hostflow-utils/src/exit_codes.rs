//! Exit codes for the hostflow process.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Run succeeded (full, fallback or resumed) |
//! | 1 | `INTERNAL` | Internal failure, failed smoke check |
//! | 2 | `CLI_ARGS` | Invalid arguments, configuration or routing |
//! | 69 | `TOOL_UNAVAILABLE` | Host tool binary not found |
//! | 70 | `TOOL_FAILURE` | Host tool exited non-zero |
//! | 124 | `TIMEOUT` | Any timeout-class terminal status |

use crate::types::{ExecutionStatus, FinalStatus};

/// Process exit code.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) for
/// `std::process::exit()`.
///
/// ```rust
/// use hostflow_utils::ExitCode;
/// use hostflow_utils::types::{ExecutionStatus, FinalStatus};
///
/// let status = FinalStatus::Failure { class: ExecutionStatus::BuilderTimeout };
/// assert_eq!(ExitCode::for_final_status(status), ExitCode::TIMEOUT);
/// assert_eq!(ExitCode::TIMEOUT.as_i32(), 124);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - run completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration, or routing
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Host tool binary missing (EX_UNAVAILABLE)
    pub const TOOL_UNAVAILABLE: ExitCode = ExitCode(69);

    /// Host tool execution failed (EX_SOFTWARE)
    pub const TOOL_FAILURE: ExitCode = ExitCode(70);

    /// Timeout - matches the `timeout(1)` convention
    pub const TIMEOUT: ExitCode = ExitCode(124);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Exit code for a single classified execution.
    #[must_use]
    pub const fn for_status(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Success => ExitCode::SUCCESS,
            ExecutionStatus::Timeout
            | ExecutionStatus::BuilderTimeout
            | ExecutionStatus::SignalKilled => ExitCode::TIMEOUT,
            ExecutionStatus::ToolError => ExitCode::TOOL_FAILURE,
        }
    }

    /// Exit code for a finished run.
    #[must_use]
    pub const fn for_final_status(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Success { .. } => ExitCode::SUCCESS,
            FinalStatus::Failure { class } => Self::for_status(class),
        }
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SuccessKind;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::TOOL_UNAVAILABLE.as_i32(), 69);
        assert_eq!(ExitCode::TOOL_FAILURE.as_i32(), 70);
        assert_eq!(ExitCode::TIMEOUT.as_i32(), 124);
    }

    #[test]
    fn test_every_timeout_class_maps_to_124() {
        for status in [
            ExecutionStatus::Timeout,
            ExecutionStatus::BuilderTimeout,
            ExecutionStatus::SignalKilled,
        ] {
            assert_eq!(ExitCode::for_status(status), ExitCode::TIMEOUT);
        }
        assert_eq!(ExitCode::for_status(ExecutionStatus::ToolError), ExitCode::TOOL_FAILURE);
    }

    #[test]
    fn test_every_success_kind_maps_to_zero() {
        for via in [SuccessKind::Full, SuccessKind::Fallback, SuccessKind::Resumed] {
            assert_eq!(
                ExitCode::for_final_status(FinalStatus::Success { via }),
                ExitCode::SUCCESS
            );
        }
    }

    #[test]
    fn test_round_trip_i32() {
        let code: i32 = ExitCode::from(124).into();
        assert_eq!(code, 124);
        assert_eq!(ExitCode::from_i32(2), ExitCode::CLI_ARGS);
    }
}
