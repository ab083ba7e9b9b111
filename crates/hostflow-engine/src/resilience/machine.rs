//! Pure transition table for builder-chain recovery.
//!
//! ```text
//! Preflight ──ok──▶ Builder ──ok──▶ Succeeded(Full)
//!     │               │ timeout-class, retry unused ──▶ Retry ──ok──▶ Succeeded(Full)
//!     │               └ otherwise ─┐                       └ fail ─┐
//!     │                            ▼                               ▼
//!     │                     FallbackDecision ◀─────────────────────┘
//!     │               fallback on + timeout-class ──▶ Fallback ──ok──▶ Succeeded(Fallback)
//!     │                            │ otherwise                 └ fail ─┐
//!     └──fail──────────────────────┴──▶ ResumeDecision ◀───────────────┘
//!                                        artifact ──▶ Succeeded(Resumed)
//!                                        none ──▶ Failed
//! ```

use hostflow_utils::types::{ExecutionStatus, SuccessKind};

/// Order in which recovery steps are tried. Any other order must be added as
/// its own variant with its own transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryOrder {
    #[default]
    RetryFallbackResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Preflight,
    Builder,
    Retry,
    FallbackDecision,
    Fallback,
    ResumeDecision,
    Succeeded(SuccessKind),
    Failed,
}

impl ChainState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ChainState::Succeeded(_) | ChainState::Failed)
    }
}

/// What the controller feeds back after acting on a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainInput {
    /// A host tool attempt finished with this status.
    Outcome(ExecutionStatus),
    /// A decision state asks for the next step.
    Decide,
}

/// Policy switches and run facts the transitions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainFlags {
    pub retry_enabled: bool,
    pub retry_used: bool,
    pub fallback_enabled: bool,
    /// The most recent builder (or retry) failure was timeout-class.
    pub last_failure_timeout_class: bool,
    /// A resume artifact was supplied and can be read.
    pub resume_available: bool,
}

/// Next state. Inputs that do not fit the current state leave it unchanged.
#[must_use]
pub fn transition(
    order: RecoveryOrder,
    state: ChainState,
    input: ChainInput,
    flags: ChainFlags,
) -> ChainState {
    match order {
        RecoveryOrder::RetryFallbackResume => retry_fallback_resume(state, input, flags),
    }
}

fn retry_fallback_resume(state: ChainState, input: ChainInput, flags: ChainFlags) -> ChainState {
    use ChainInput::{Decide, Outcome};
    use ChainState::*;

    match (state, input) {
        (Preflight, Outcome(status)) if status.is_success() => Builder,
        (Preflight, Outcome(_)) => ResumeDecision,

        (Builder, Outcome(status)) if status.is_success() => Succeeded(SuccessKind::Full),
        (Builder, Outcome(status))
            if retryable(status) && flags.retry_enabled && !flags.retry_used =>
        {
            Retry
        }
        (Builder, Outcome(_)) => FallbackDecision,

        (Retry, Outcome(status)) if status.is_success() => Succeeded(SuccessKind::Full),
        (Retry, Outcome(_)) => FallbackDecision,

        (FallbackDecision, Decide) if flags.fallback_enabled && flags.last_failure_timeout_class => {
            Fallback
        }
        (FallbackDecision, Decide) => ResumeDecision,

        (Fallback, Outcome(status)) if status.is_success() => Succeeded(SuccessKind::Fallback),
        (Fallback, Outcome(_)) => ResumeDecision,

        (ResumeDecision, Decide) if flags.resume_available => Succeeded(SuccessKind::Resumed),
        (ResumeDecision, Decide) => Failed,

        (state, _) => state,
    }
}

fn retryable(status: ExecutionStatus) -> bool {
    matches!(
        status,
        ExecutionStatus::BuilderTimeout | ExecutionStatus::SignalKilled
    )
}
