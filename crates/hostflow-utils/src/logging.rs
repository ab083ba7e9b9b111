//! Logging setup and stage-level log helpers.
//!
//! Logs go to stderr so stdout stays reserved for the host tool's own output.

use crate::types::{CommandKind, ExecutionOutcome, Stage};
use std::time::Duration;
use tracing::{Level, debug, span, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects `hostflow=debug`, and
/// the default is `hostflow=info,warn`.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("hostflow=debug,info")
            } else {
                EnvFilter::try_new("hostflow=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Span covering one attempt against the host tool.
pub fn stage_span(stage: Stage, kind: CommandKind, timeout: Duration) -> tracing::Span {
    span!(
        Level::INFO,
        "stage",
        stage = %stage,
        kind = %kind,
        timeout_ms = timeout.as_millis() as u64,
    )
}

/// Log a finished attempt: `debug` on success, `warn` otherwise.
pub fn log_stage_outcome(stage: Stage, outcome: &ExecutionOutcome) {
    if outcome.is_success() {
        debug!(
            stage = %stage,
            status = %outcome.status,
            duration_ms = outcome.duration_ms,
            "stage succeeded"
        );
    } else {
        warn!(
            stage = %stage,
            status = %outcome.status,
            code = outcome.exit_code,
            duration_ms = outcome.duration_ms,
            "stage failed"
        );
    }
}

/// One-line hint printed for each failed stage, e.g.
/// `hostflow stage builder: builder_timeout (code=124)`.
#[must_use]
pub fn stage_failure_hint(stage: Stage, outcome: &ExecutionOutcome) -> String {
    format!(
        "hostflow stage {stage}: {} (code={})",
        outcome.status, outcome.exit_code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionStatus;

    fn outcome(status: ExecutionStatus, exit_code: i32) -> ExecutionOutcome {
        ExecutionOutcome {
            status,
            exit_code,
            timed_out: status.is_timeout_class(),
            signal: None,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            stdout_bytes: 0,
            stderr_bytes: 0,
            duration_ms: 5,
            note: None,
        }
    }

    #[test]
    fn test_stage_failure_hint_format() {
        let hint = stage_failure_hint(Stage::Builder, &outcome(ExecutionStatus::BuilderTimeout, 124));
        assert_eq!(hint, "hostflow stage builder: builder_timeout (code=124)");
    }

    #[test]
    fn test_log_helpers_do_not_panic_without_subscriber() {
        let _span = stage_span(Stage::Command, CommandKind::Exec, Duration::from_secs(1)).entered();
        log_stage_outcome(Stage::Command, &outcome(ExecutionStatus::Success, 0));
        log_stage_outcome(Stage::Command, &outcome(ExecutionStatus::ToolError, 3));
    }
}
