use camino::{Utf8Path, Utf8PathBuf};
use hostflow_config::DEFAULT_RETRY_TIMEOUT_SCALE;
use hostflow_runner::ProcessRunner;
use hostflow_utils::atomic_write::write_bytes_atomic;
use hostflow_utils::error::HostflowError;
use hostflow_utils::logging::{log_stage_outcome, stage_span};
use hostflow_utils::types::{
    ExecutionStatus, FinalStatus, PreflightCheck, ResilienceRun, Stage, StageRecord, SuccessKind,
};
use std::time::Duration;

use super::machine::{ChainFlags, ChainInput, ChainState, RecoveryOrder, transition};
use crate::executor::{CommandInvocation, Execution, Executor};

// The longest path through the table is eight states.
const MAX_STEPS: usize = 16;

/// Caller-selected recovery behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPolicy {
    pub order: RecoveryOrder,
    pub retry_on_timeout: bool,
    pub retry_timeout: Option<Duration>,
    pub retry_timeout_scale: f64,
    pub fallback_export_on_timeout: bool,
    pub resume_from_export: Option<Utf8PathBuf>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            order: RecoveryOrder::default(),
            retry_on_timeout: false,
            retry_timeout: None,
            retry_timeout_scale: DEFAULT_RETRY_TIMEOUT_SCALE,
            fallback_export_on_timeout: false,
            resume_from_export: None,
        }
    }
}

impl RecoveryPolicy {
    /// Explicit retry timeout, else `max(base + 1s, base × scale)` with the
    /// scale clamped to at least 1.0. Saturates at `Duration::MAX`.
    #[must_use]
    pub fn retry_timeout_for(&self, base: Duration) -> Duration {
        if let Some(explicit) = self.retry_timeout.filter(|t| !t.is_zero()) {
            return explicit;
        }
        let scale = if self.retry_timeout_scale.is_finite() {
            self.retry_timeout_scale.max(1.0)
        } else {
            DEFAULT_RETRY_TIMEOUT_SCALE
        };
        let scaled =
            Duration::try_from_secs_f64(base.as_secs_f64() * scale).unwrap_or(Duration::MAX);
        scaled.max(base.saturating_add(Duration::from_secs(1)))
    }
}

/// Invocations making up one builder chain.
#[derive(Debug, Clone)]
pub struct BuilderChain {
    /// Health checks run first; empty for plain plan-export.
    pub preflight: Vec<(PreflightCheck, CommandInvocation)>,
    pub builder: CommandInvocation,
    pub fallback: CommandInvocation,
    /// Removed before the builder runs; resume copies into it.
    pub out_path: Utf8PathBuf,
}

/// Result of driving a chain to a terminal state.
#[derive(Debug, Clone)]
pub struct ChainResult {
    pub run: ResilienceRun,
    /// Output of the last attempt, for echoing.
    pub last: Option<Execution>,
    /// Preflight checks in order with their pass/fail result.
    pub preflight: Vec<(PreflightCheck, bool)>,
}

/// Drives a [`BuilderChain`] through the recovery table.
pub struct ResilienceController<'a, R: ProcessRunner> {
    executor: &'a Executor<R>,
    policy: &'a RecoveryPolicy,
}

struct Progress {
    attempts: Vec<StageRecord>,
    last: Option<Execution>,
    last_failure: Option<ExecutionStatus>,
    preflight: Vec<(PreflightCheck, bool)>,
}

impl<'a, R: ProcessRunner> ResilienceController<'a, R> {
    #[must_use]
    pub fn new(executor: &'a Executor<R>, policy: &'a RecoveryPolicy) -> Self {
        Self { executor, policy }
    }

    /// Run the chain. `Err` only for failures that prevent any attempt from
    /// being observed, such as a missing host binary.
    pub fn run(&self, chain: &BuilderChain) -> Result<ChainResult, HostflowError> {
        let mut run = ResilienceRun::new(
            Vec::new(),
            FinalStatus::Failure {
                class: ExecutionStatus::ToolError,
            },
        );
        let mut progress = Progress {
            attempts: Vec::new(),
            last: None,
            last_failure: None,
            preflight: Vec::new(),
        };
        let mut flags = ChainFlags {
            retry_enabled: self.policy.retry_on_timeout,
            fallback_enabled: self.policy.fallback_export_on_timeout,
            ..ChainFlags::default()
        };
        let mut resume_bytes: Option<Vec<u8>> = None;

        let mut state = if chain.preflight.is_empty() {
            ChainState::Builder
        } else {
            ChainState::Preflight
        };

        for _ in 0..MAX_STEPS {
            if state.is_terminal() {
                break;
            }

            let input = match state {
                ChainState::Preflight => ChainInput::Outcome(self.preflight(chain, &mut progress)?),
                ChainState::Builder => {
                    remove_stale_output(&chain.out_path);
                    let status = self.attempt(Stage::Builder, &chain.builder, &mut progress)?;
                    flags.last_failure_timeout_class = status.is_timeout_class();
                    ChainInput::Outcome(status)
                }
                ChainState::Retry => {
                    let timeout = self.policy.retry_timeout_for(chain.builder.timeout);
                    flags.retry_used = true;
                    run.retried = true;
                    run.retry_timeout_ms = Some(timeout.as_millis() as u64);
                    tracing::info!(timeout_ms = timeout.as_millis() as u64, "retrying builder stage");

                    let retry = chain.builder.with_timeout(timeout);
                    let status = self.attempt(Stage::BuilderRetry, &retry, &mut progress)?;
                    flags.last_failure_timeout_class = status.is_timeout_class();
                    ChainInput::Outcome(status)
                }
                ChainState::Fallback => {
                    run.fell_back = true;
                    tracing::info!("builder did not finish; running selection-only export");
                    let status = self.attempt(Stage::FallbackExport, &chain.fallback, &mut progress)?;
                    ChainInput::Outcome(status)
                }
                ChainState::FallbackDecision => ChainInput::Decide,
                ChainState::ResumeDecision => {
                    if let Some(source) = &self.policy.resume_from_export {
                        match read_resume_artifact(source) {
                            Ok(bytes) => resume_bytes = Some(bytes),
                            Err(err) => {
                                tracing::warn!("{err}");
                                run.resume_error = Some(err.to_string());
                            }
                        }
                    }
                    flags.resume_available = resume_bytes.is_some();
                    ChainInput::Decide
                }
                ChainState::Succeeded(_) | ChainState::Failed => break,
            };

            let next = transition(self.policy.order, state, input, flags);
            tracing::debug!(from = ?state, to = ?next, "recovery transition");
            state = next;
        }

        if let (ChainState::Succeeded(SuccessKind::Resumed), Some(bytes), Some(source)) =
            (state, &resume_bytes, &self.policy.resume_from_export)
        {
            match write_bytes_atomic(&chain.out_path, bytes) {
                Ok(()) => {
                    run.resumed = true;
                    run.resumed_from = Some(source.to_string());
                    tracing::info!(from = %source, to = %chain.out_path, "reused existing export");
                }
                Err(e) => {
                    let err = HostflowError::ResumeArtifactMissing {
                        path: source.to_string(),
                        reason: format!("copy to {} failed: {e:#}", chain.out_path),
                    };
                    tracing::warn!("{err}");
                    run.resume_error = Some(err.to_string());
                    state = ChainState::Failed;
                }
            }
        }

        run.final_status = match state {
            ChainState::Succeeded(via) => FinalStatus::Success { via },
            _ => FinalStatus::Failure {
                class: progress.last_failure.unwrap_or(ExecutionStatus::ToolError),
            },
        };
        run.attempts = progress.attempts;

        Ok(ChainResult {
            run,
            last: progress.last,
            preflight: progress.preflight,
        })
    }

    /// Run every check (all of them, so the report shows each result) and
    /// fold them into one status: success, or the first failure.
    fn preflight(
        &self,
        chain: &BuilderChain,
        progress: &mut Progress,
    ) -> Result<ExecutionStatus, HostflowError> {
        let mut first_failure = None;
        for (check, invocation) in &chain.preflight {
            let status = self.attempt(Stage::Preflight(*check), invocation, progress)?;
            progress.preflight.push((*check, status.is_success()));
            if !status.is_success() && first_failure.is_none() {
                first_failure = Some(status);
            }
        }
        if let Some(status) = first_failure {
            progress.last_failure = Some(status);
        }
        Ok(first_failure.unwrap_or(ExecutionStatus::Success))
    }

    fn attempt(
        &self,
        stage: Stage,
        invocation: &CommandInvocation,
        progress: &mut Progress,
    ) -> Result<ExecutionStatus, HostflowError> {
        let _span = stage_span(stage, invocation.kind, invocation.timeout).entered();
        let invocation = invocation.clone().builder_related(stage.is_builder());
        let execution = self.executor.run(&invocation)?;
        log_stage_outcome(stage, &execution.outcome);

        let status = execution.outcome.status;
        if stage.is_builder() && !status.is_success() {
            progress.last_failure = Some(status);
        }
        progress.attempts.push(StageRecord {
            stage,
            kind: invocation.kind,
            timeout_ms: invocation.timeout.as_millis() as u64,
            outcome: execution.outcome.clone(),
        });
        progress.last = Some(execution);
        Ok(status)
    }
}

fn remove_stale_output(path: &Utf8Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path, "removed previous output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path, error = %e, "could not remove previous output"),
    }
}

fn read_resume_artifact(path: &Utf8Path) -> Result<Vec<u8>, HostflowError> {
    let missing = |reason: String| HostflowError::ResumeArtifactMissing {
        path: path.to_string(),
        reason,
    };
    let metadata = std::fs::metadata(path).map_err(|e| missing(e.to_string()))?;
    if !metadata.is_file() {
        return Err(missing("not a regular file".to_string()));
    }
    std::fs::read(path).map_err(|e| missing(e.to_string()))
}
