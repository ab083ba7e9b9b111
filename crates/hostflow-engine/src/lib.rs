//! Routing, execution and recovery for hostflow.
//!
//! [`flows::Engine`] is the entry point: it resolves a target through
//! [`router`], runs host tool calls through [`executor`], drives builder
//! chains through [`resilience`], and persists the target via [`state`] once
//! a run succeeds.

pub mod classify;
pub mod executor;
pub mod flows;
pub mod host;
pub mod resilience;
pub mod router;
pub mod state;

#[cfg(test)]
mod test_support;

pub use classify::{Classifier, HostOperation, OutcomeRule, WorkspaceAlreadyActive};
pub use executor::{CommandInvocation, Execution, Executor};
pub use flows::{Engine, FlowCommand, FlowOutcome, FlowRequest};
pub use resilience::{RecoveryOrder, RecoveryPolicy};
pub use router::RoutingRequest;
pub use state::{RoutingState, RoutingStateStore};
