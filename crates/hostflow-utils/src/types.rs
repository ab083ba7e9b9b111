//! Data model shared by the engine, the report emitter and the CLI.
//!
//! Everything here serializes with stable snake_case field names because it
//! ends up in run reports consumed by automation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Command kinds
// ============================================================================

/// Kind of host tool operation, used to look up profile timeouts and to tag
/// report entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Exec,
    Call,
    ToolsSchema,
    Export,
    PlanExport,
    Autopilot,
    Preflight,
    Smoke,
}

impl CommandKind {
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Exec,
        CommandKind::Call,
        CommandKind::ToolsSchema,
        CommandKind::Export,
        CommandKind::PlanExport,
        CommandKind::Autopilot,
        CommandKind::Preflight,
        CommandKind::Smoke,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandKind::Exec => "exec",
            CommandKind::Call => "call",
            CommandKind::ToolsSchema => "tools_schema",
            CommandKind::Export => "export",
            CommandKind::PlanExport => "plan_export",
            CommandKind::Autopilot => "autopilot",
            CommandKind::Preflight => "preflight",
            CommandKind::Smoke => "smoke",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health checks run before a builder chain (autopilot) and by `smoke`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreflightCheck {
    Tabs,
    Context,
    ToolsSchema,
}

impl PreflightCheck {
    pub const ALL: [PreflightCheck; 3] = [
        PreflightCheck::Tabs,
        PreflightCheck::Context,
        PreflightCheck::ToolsSchema,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PreflightCheck::Tabs => "tabs",
            PreflightCheck::Context => "context",
            PreflightCheck::ToolsSchema => "tools_schema",
        }
    }
}

// ============================================================================
// Stages and outcomes
// ============================================================================

/// One step of a run. Serialized as a flat string such as `preflight:tabs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    WorkspaceSwitch,
    Command,
    Preflight(PreflightCheck),
    Builder,
    BuilderRetry,
    FallbackExport,
}

impl Stage {
    /// Builder-class stages get `timeout` reclassified as `builder_timeout`.
    #[must_use]
    pub const fn is_builder(self) -> bool {
        matches!(self, Stage::Builder | Stage::BuilderRetry)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::WorkspaceSwitch => f.write_str("workspace_switch"),
            Stage::Command => f.write_str("command"),
            Stage::Preflight(check) => write!(f, "preflight:{}", check.as_str()),
            Stage::Builder => f.write_str("builder"),
            Stage::BuilderRetry => f.write_str("builder_retry"),
            Stage::FallbackExport => f.write_str("fallback_export"),
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Classification of a single host tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Timeout,
    BuilderTimeout,
    SignalKilled,
    ToolError,
}

impl ExecutionStatus {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    /// Timeout, builder timeout, or a kill signal. These are the failures the
    /// recovery chain reacts to and the ones that surface as exit code 124.
    #[must_use]
    pub const fn is_timeout_class(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Timeout | ExecutionStatus::BuilderTimeout | ExecutionStatus::SignalKilled
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::BuilderTimeout => "builder_timeout",
            ExecutionStatus::SignalKilled => "signal_killed",
            ExecutionStatus::ToolError => "tool_error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of one host tool process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Process exit code; 124 when the timeout fired, 128+N when killed by signal N.
    pub exit_code: i32,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub stdout_bytes: usize,
    pub stderr_bytes: usize,
    pub duration_ms: u64,
    /// Name of the classification rule that overrode the raw result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExecutionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// One attempt in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub kind: CommandKind,
    pub timeout_ms: u64,
    pub outcome: ExecutionOutcome,
}

// ============================================================================
// Routing
// ============================================================================

/// A fully resolved host tool target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub window: u32,
    pub tab: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

/// Where the resolved window came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    Explicit,
    LastGood,
    SoleWindow,
}

/// Where the resolved workspace came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceSource {
    Explicit,
    LastGood,
    ConfigDefault,
}

/// Routing decision as recorded in a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub window: u32,
    pub window_source: WindowSource,
    pub tab: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_source: Option<WorkspaceSource>,
    pub strict: bool,
}

impl RoutingDecision {
    #[must_use]
    pub fn target(&self) -> Target {
        Target {
            window: self.window,
            tab: self.tab.clone(),
            workspace: self.workspace.clone(),
        }
    }
}

// ============================================================================
// Run results
// ============================================================================

/// How a successful run got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessKind {
    Full,
    Fallback,
    Resumed,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FinalStatus {
    Success { via: SuccessKind },
    Failure { class: ExecutionStatus },
}

impl FinalStatus {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, FinalStatus::Success { .. })
    }
}

/// Every attempt a run made and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResilienceRun {
    #[serde(rename = "stages")]
    pub attempts: Vec<StageRecord>,
    pub retried: bool,
    pub fell_back: bool,
    pub resumed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<String>,
    /// Why a supplied resume artifact could not be used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_error: Option<String>,
    pub final_status: FinalStatus,
}

impl ResilienceRun {
    /// Run with the given attempts and no recovery bookkeeping.
    #[must_use]
    pub fn new(attempts: Vec<StageRecord>, final_status: FinalStatus) -> Self {
        Self {
            attempts,
            retried: false,
            fell_back: false,
            resumed: false,
            retry_timeout_ms: None,
            resumed_from: None,
            resume_error: None,
            final_status,
        }
    }

    /// The last attempt, whose output is echoed to the user.
    #[must_use]
    pub fn last_attempt(&self) -> Option<&StageRecord> {
        self.attempts.last()
    }
}

/// Output artifact as observed after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub path: String,
    pub exists: bool,
    pub bytes: u64,
}

/// Summary of the request that started the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationSummary {
    pub profile: String,
    pub timeout_ms: u64,
    pub strict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub retry_on_timeout: bool,
    pub fallback_export_on_timeout: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_from_export: Option<String>,
}

/// Error that ended a run before or outside the attempt chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportError {
    pub kind: String,
    pub message: String,
}

/// Write-once record of one hostflow invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub report_version: u32,
    pub command: CommandKind,
    pub invocation: InvocationSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub exit_code: i32,
    pub ok: bool,
    pub routing: Option<RoutingDecision>,
    pub run: Option<ResilienceRun>,
    pub artifact: Option<ArtifactSummary>,
    pub error: Option<ReportError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Preflight(PreflightCheck::Tabs).to_string(), "preflight:tabs");
        assert_eq!(Stage::BuilderRetry.to_string(), "builder_retry");
        assert_eq!(
            serde_json::to_value(Stage::FallbackExport).unwrap(),
            serde_json::json!("fallback_export")
        );
    }

    #[test]
    fn test_only_builder_stages_are_builder_class() {
        assert!(Stage::Builder.is_builder());
        assert!(Stage::BuilderRetry.is_builder());
        assert!(!Stage::FallbackExport.is_builder());
        assert!(!Stage::Preflight(PreflightCheck::Context).is_builder());
    }

    #[test]
    fn test_timeout_class() {
        assert!(ExecutionStatus::Timeout.is_timeout_class());
        assert!(ExecutionStatus::BuilderTimeout.is_timeout_class());
        assert!(ExecutionStatus::SignalKilled.is_timeout_class());
        assert!(!ExecutionStatus::ToolError.is_timeout_class());
        assert!(!ExecutionStatus::Success.is_timeout_class());
    }

    #[test]
    fn test_final_status_serialization() {
        let ok = FinalStatus::Success {
            via: SuccessKind::Fallback,
        };
        assert_eq!(
            serde_json::to_value(ok).unwrap(),
            serde_json::json!({"result": "success", "via": "fallback"})
        );

        let failed = FinalStatus::Failure {
            class: ExecutionStatus::BuilderTimeout,
        };
        assert_eq!(
            serde_json::to_value(failed).unwrap(),
            serde_json::json!({"result": "failure", "class": "builder_timeout"})
        );
    }

    #[test]
    fn test_command_kind_names_match_serde() {
        for kind in CommandKind::ALL {
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::json!(kind.as_str())
            );
        }
    }

    #[test]
    fn test_resilience_run_serializes_attempts_as_stages() {
        let run = ResilienceRun::new(
            Vec::new(),
            FinalStatus::Success {
                via: SuccessKind::Full,
            },
        );
        let value = serde_json::to_value(&run).unwrap();
        assert!(value["stages"].as_array().unwrap().is_empty());
        assert!(value.get("retry_timeout_ms").is_none());
    }
}
