//! Deterministic target resolution.
//!
//! Window: explicit, else the last-good window if it is still open, else the
//! only open window, else [`RoutingError::AmbiguousRouting`]. Tab: explicit or
//! [`DEFAULT_TAB`], and it must exist in the chosen window. Workspace:
//! explicit, else last-good (non-strict only), else the configured default.

use hostflow_runner::ProcessRunner;
use hostflow_utils::error::{HostflowError, RoutingError};
use hostflow_utils::types::{CommandKind, RoutingDecision, WindowSource, WorkspaceSource};

use crate::classify::HostOperation;
use crate::executor::{CommandInvocation, Executor};
use crate::host::{self, DEFAULT_TAB, LISTING_TIMEOUT};
use crate::state::RoutingState;

/// Caller-supplied routing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingRequest {
    pub window: Option<u32>,
    pub tab: Option<String>,
    pub workspace: Option<String>,
    pub strict: bool,
}

impl RoutingRequest {
    /// Strict mode needs every field explicit. Checked before any host call.
    pub fn check_strict(&self) -> Result<(), RoutingError> {
        if !self.strict {
            return Ok(());
        }
        let mut missing = Vec::new();
        if self.window.is_none() {
            missing.push("window");
        }
        if self.tab.as_deref().is_none_or(str::is_empty) {
            missing.push("tab");
        }
        if self.workspace.as_deref().is_none_or(str::is_empty) {
            missing.push("workspace");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RoutingError::StrictRoutingRequired { missing })
        }
    }
}

/// Live view of the host application's windows and tabs.
pub trait LiveTargets {
    fn windows(&self) -> Result<Vec<u32>, HostflowError>;
    fn tabs(&self, window: u32) -> Result<Vec<String>, HostflowError>;
}

impl<R: ProcessRunner> LiveTargets for Executor<R> {
    fn windows(&self) -> Result<Vec<u32>, HostflowError> {
        let invocation = CommandInvocation::new(
            CommandKind::Exec,
            HostOperation::ListWindows,
            host::list_windows_args(),
            LISTING_TIMEOUT,
        );
        let execution = self.run(&invocation)?;
        if !execution.outcome.is_success() {
            return Err(listing_failed("list windows", &execution));
        }
        host::parse_windows(&execution.stdout)
    }

    fn tabs(&self, window: u32) -> Result<Vec<String>, HostflowError> {
        let invocation = CommandInvocation::new(
            CommandKind::Exec,
            HostOperation::ListTabs,
            host::list_tabs_args(window),
            LISTING_TIMEOUT,
        );
        let execution = self.run(&invocation)?;
        if !execution.outcome.is_success() {
            return Err(listing_failed("list tabs", &execution));
        }
        host::parse_tabs(&execution.stdout)
    }
}

fn listing_failed(operation: &str, execution: &crate::executor::Execution) -> HostflowError {
    let status = execution.outcome.status;
    if status.is_timeout_class() {
        return HostflowError::ListingTimedOut {
            operation: operation.to_string(),
            status,
        };
    }
    let detail = if execution.stderr.trim().is_empty() {
        execution.stdout.trim()
    } else {
        execution.stderr.trim()
    };
    let reason = if detail.is_empty() {
        format!("{} (code={})", execution.outcome.status, execution.outcome.exit_code)
    } else {
        format!("{} (code={}): {detail}", execution.outcome.status, execution.outcome.exit_code)
    };
    host::protocol(operation, reason)
}

/// Pick a window. Pure: `live` is only consulted when no window is explicit.
pub fn resolve_window(
    explicit: Option<u32>,
    remembered: Option<u32>,
    live: &[u32],
) -> Result<(u32, WindowSource), RoutingError> {
    if let Some(window) = explicit {
        return Ok((window, WindowSource::Explicit));
    }
    if let Some(window) = remembered.filter(|w| live.contains(w)) {
        return Ok((window, WindowSource::LastGood));
    }
    match live {
        [only] => Ok((*only, WindowSource::SoleWindow)),
        _ => Err(RoutingError::AmbiguousRouting {
            candidates: live.to_vec(),
        }),
    }
}

/// Pick a workspace, if any applies.
#[must_use]
pub fn resolve_workspace(
    request: &RoutingRequest,
    remembered: Option<&RoutingState>,
    default_workspace: Option<&str>,
) -> Option<(String, WorkspaceSource)> {
    if let Some(ws) = request.workspace.as_deref().filter(|ws| !ws.is_empty()) {
        return Some((ws.to_string(), WorkspaceSource::Explicit));
    }
    if !request.strict
        && let Some(ws) = remembered.and_then(|s| s.workspace.as_deref())
    {
        return Some((ws.to_string(), WorkspaceSource::LastGood));
    }
    default_workspace.map(|ws| (ws.to_string(), WorkspaceSource::ConfigDefault))
}

/// Resolve a full routing decision against the live host state.
pub fn resolve(
    request: &RoutingRequest,
    remembered: Option<&RoutingState>,
    default_workspace: Option<&str>,
    live: &impl LiveTargets,
) -> Result<RoutingDecision, HostflowError> {
    request.check_strict()?;

    let remembered = if request.strict { None } else { remembered };

    let (window, window_source) = match request.window {
        Some(window) => (window, WindowSource::Explicit),
        None => {
            let windows = live.windows()?;
            resolve_window(None, remembered.and_then(|s| s.window), &windows)?
        }
    };

    let tab = request
        .tab
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TAB.to_string());
    let tabs = live.tabs(window)?;
    if !tabs.contains(&tab) {
        return Err(RoutingError::TabNotFound {
            window,
            tab,
            available: tabs,
        }
        .into());
    }

    let (workspace, workspace_source) =
        match resolve_workspace(request, remembered, default_workspace) {
            Some((ws, source)) => (Some(ws), Some(source)),
            None => (None, None),
        };

    tracing::info!(
        window,
        window_source = ?window_source,
        tab = %tab,
        workspace = workspace.as_deref().unwrap_or("-"),
        "routing resolved"
    );

    Ok(RoutingDecision {
        window,
        window_source,
        tab,
        workspace,
        workspace_source,
        strict: request.strict,
    })
}
