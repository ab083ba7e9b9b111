//! Classification of raw process results into [`ExecutionOutcome`]s.
//!
//! The base classification only looks at how the process ended. Host tool
//! quirks (such as reporting "already on workspace" with a failing exit code)
//! are handled by [`OutcomeRule`]s keyed by [`HostOperation`], so control flow
//! never special-cases output text.

use hostflow_runner::ProcessOutput;
use hostflow_utils::types::{ExecutionOutcome, ExecutionStatus, PreflightCheck};

/// Exit code reported for a timed-out process, matching `timeout(1)`.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Host tool operation an output belongs to; the key for classification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    ListWindows,
    ListTabs,
    WorkspaceSwitch,
    Exec,
    Call,
    ToolsSchema,
    Export,
    PlanExport,
    Preflight(PreflightCheck),
}

/// A rule that may override the base classification of an operation's output.
pub trait OutcomeRule: Send + Sync {
    /// Recorded in the outcome's `note` when the rule fires.
    fn name(&self) -> &'static str;

    fn applies_to(&self, operation: HostOperation) -> bool;

    /// Replacement status, or `None` to keep the base classification.
    fn reclassify(&self, output: &ProcessOutput, base: ExecutionStatus) -> Option<ExecutionStatus>;
}

/// The host tool exits non-zero when asked to switch to the workspace that is
/// already active. That is the desired end state, so it counts as success.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceAlreadyActive;

impl WorkspaceAlreadyActive {
    pub const MARKER: &'static str = "already on workspace";
}

impl OutcomeRule for WorkspaceAlreadyActive {
    fn name(&self) -> &'static str {
        "workspace_already_active"
    }

    fn applies_to(&self, operation: HostOperation) -> bool {
        operation == HostOperation::WorkspaceSwitch
    }

    fn reclassify(&self, output: &ProcessOutput, base: ExecutionStatus) -> Option<ExecutionStatus> {
        if base != ExecutionStatus::ToolError {
            return None;
        }
        output
            .merged_text()
            .to_lowercase()
            .contains(Self::MARKER)
            .then_some(ExecutionStatus::Success)
    }
}

/// Ordered set of rules applied after base classification. First match wins.
pub struct Classifier {
    rules: Vec<Box<dyn OutcomeRule>>,
    tail_bytes: usize,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("Classifier")
            .field("rules", &names)
            .field("tail_bytes", &self.tail_bytes)
            .finish()
    }
}

impl Classifier {
    /// Classifier with the built-in rules.
    #[must_use]
    pub fn new(tail_bytes: usize) -> Self {
        Self {
            rules: vec![Box::new(WorkspaceAlreadyActive)],
            tail_bytes,
        }
    }

    /// Classifier with no rules at all.
    #[must_use]
    pub fn bare(tail_bytes: usize) -> Self {
        Self {
            rules: Vec::new(),
            tail_bytes,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl OutcomeRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Classify `output`. `builder_related` turns a plain timeout into
    /// `builder_timeout`.
    #[must_use]
    pub fn classify(
        &self,
        operation: HostOperation,
        builder_related: bool,
        output: &ProcessOutput,
    ) -> ExecutionOutcome {
        let base = base_status(output, builder_related);

        let mut status = base;
        let mut note = None;
        if let Some(rule) = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(operation))
            .find_map(|rule| rule.reclassify(output, base).map(|s| (rule.name(), s)))
        {
            tracing::debug!(rule = rule.0, from = %base, to = %rule.1, "classification rule applied");
            note = Some(rule.0.to_string());
            status = rule.1;
        }

        ExecutionOutcome {
            status,
            exit_code: reported_exit_code(output),
            timed_out: output.timed_out,
            signal: output.signal,
            stdout_tail: tail(&output.stdout, self.tail_bytes),
            stderr_tail: tail(&output.stderr, self.tail_bytes),
            stdout_bytes: output.stdout_bytes,
            stderr_bytes: output.stderr_bytes,
            duration_ms: output.duration.as_millis() as u64,
            note,
        }
    }
}

fn base_status(output: &ProcessOutput, builder_related: bool) -> ExecutionStatus {
    if output.force_killed {
        ExecutionStatus::SignalKilled
    } else if output.timed_out {
        if builder_related {
            ExecutionStatus::BuilderTimeout
        } else {
            ExecutionStatus::Timeout
        }
    } else if output.signal.is_some() {
        ExecutionStatus::SignalKilled
    } else if output.exit_code == Some(0) {
        ExecutionStatus::Success
    } else {
        ExecutionStatus::ToolError
    }
}

fn reported_exit_code(output: &ProcessOutput) -> i32 {
    if output.timed_out && !output.force_killed {
        return TIMEOUT_EXIT_CODE;
    }
    match (output.exit_code, output.signal) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

/// Last `limit` bytes of `text`, moved forward to a char boundary.
fn tail(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
