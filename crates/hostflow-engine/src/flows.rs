//! The user-facing commands, each built from routing, the executor and the
//! resilience controller.

use camino::{Utf8Path, Utf8PathBuf};
use hostflow_config::{Config, ProfileName};
use hostflow_runner::{NativeRunner, ProcessRunner};
use hostflow_utils::error::HostflowError;
use hostflow_utils::exit_codes::ExitCode;
use hostflow_utils::logging::{log_stage_outcome, stage_span};
use hostflow_utils::types::{
    CommandKind, FinalStatus, PreflightCheck, ResilienceRun, RoutingDecision,
    Stage, StageRecord, SuccessKind,
};
use std::time::Duration;

use crate::classify::HostOperation;
use crate::executor::{CommandInvocation, Execution, Executor};
use crate::host;
use crate::resilience::{BuilderChain, RecoveryPolicy, ResilienceController};
use crate::router::{self, RoutingRequest};
use crate::state::{RoutingState, RoutingStateStore};

/// What to run once a target is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowCommand {
    Exec {
        command: String,
        raw_json: bool,
    },
    Call {
        tool: String,
        json_arg: Option<String>,
    },
    /// Selection-only export.
    Export {
        select_set: Vec<String>,
        out: Utf8PathBuf,
    },
    PlanExport {
        select_set: Vec<String>,
        task: String,
        out: Utf8PathBuf,
        recovery: RecoveryPolicy,
    },
    /// Preflight checks, then plan export.
    Autopilot {
        select_set: Vec<String>,
        task: String,
        out: Utf8PathBuf,
        recovery: RecoveryPolicy,
        preflight_timeout: Option<Duration>,
    },
    /// Routing, workspace switch and the preflight checks.
    Smoke,
    /// Schema passthrough; needs no routing.
    ToolsSchema {
        group: Option<String>,
    },
}

impl FlowCommand {
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            FlowCommand::Exec { .. } => CommandKind::Exec,
            FlowCommand::Call { .. } => CommandKind::Call,
            FlowCommand::Export { .. } => CommandKind::Export,
            FlowCommand::PlanExport { .. } => CommandKind::PlanExport,
            FlowCommand::Autopilot { .. } => CommandKind::Autopilot,
            FlowCommand::Smoke => CommandKind::Smoke,
            FlowCommand::ToolsSchema { .. } => CommandKind::ToolsSchema,
        }
    }

    /// Output file the command produces, if any.
    #[must_use]
    pub fn out_path(&self) -> Option<&Utf8Path> {
        match self {
            FlowCommand::Export { out, .. }
            | FlowCommand::PlanExport { out, .. }
            | FlowCommand::Autopilot { out, .. } => Some(out),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowRequest {
    pub command: FlowCommand,
    pub routing: RoutingRequest,
    pub profile: ProfileName,
    /// Overrides the profile timeout for the main command.
    pub timeout: Option<Duration>,
}

/// Everything a finished flow hands back for reporting.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub routing: Option<RoutingDecision>,
    pub run: ResilienceRun,
    /// Output of the last attempt.
    pub last: Option<Execution>,
    /// Per-check results of smoke and autopilot preflight.
    pub checks: Vec<(PreflightCheck, bool)>,
    pub exit_code: ExitCode,
}

/// Runs flows against one host tool with one state file.
pub struct Engine<R: ProcessRunner> {
    executor: Executor<R>,
    store: RoutingStateStore,
    default_workspace: Option<String>,
}

impl Engine<NativeRunner> {
    pub fn native(config: &Config) -> Result<Self, HostflowError> {
        let store = RoutingStateStore::new(config.resolved_state_path()?);
        Ok(Self::new(Executor::native(config)?, store, config.default_workspace.clone()))
    }
}

impl<R: ProcessRunner> Engine<R> {
    #[must_use]
    pub fn new(
        executor: Executor<R>,
        store: RoutingStateStore,
        default_workspace: Option<String>,
    ) -> Self {
        Self {
            executor,
            store,
            default_workspace,
        }
    }

    /// Run one flow to a terminal state.
    ///
    /// `Err` means no attempt could be made: configuration, routing, or host
    /// tool availability. Attempt failures are reported through
    /// [`FlowOutcome::run`] and the exit code.
    pub fn run(&self, request: &FlowRequest) -> Result<FlowOutcome, HostflowError> {
        let kind = request.command.kind();
        let timeout = hostflow_config::resolve(request.profile, kind, request.timeout)?;
        if let FlowCommand::PlanExport { recovery, .. } | FlowCommand::Autopilot { recovery, .. } =
            &request.command
            && let Some(retry) = recovery.retry_timeout
        {
            hostflow_config::check_timeout("retry_timeout", retry)?;
        }

        if let FlowCommand::ToolsSchema { group } = &request.command {
            return self.single(None, Stage::Command, &schema_invocation(group.as_deref(), timeout));
        }

        let remembered = if request.routing.strict {
            None
        } else {
            self.store.load()
        };
        let decision = router::resolve(
            &request.routing,
            remembered.as_ref(),
            self.default_workspace.as_deref(),
            &self.executor,
        )?;

        if let Some(workspace) = decision.workspace.as_deref() {
            let invocation = CommandInvocation::new(
                CommandKind::Exec,
                HostOperation::WorkspaceSwitch,
                host::exec_args(
                    decision.window,
                    &decision.tab,
                    &host::workspace_switch_command(workspace),
                    false,
                ),
                timeout,
            );
            let (execution, record) = self.attempt(Stage::WorkspaceSwitch, &invocation)?;
            if !execution.outcome.is_success() {
                let class = execution.outcome.status;
                return Ok(FlowOutcome {
                    routing: Some(decision),
                    run: ResilienceRun::new(vec![record], FinalStatus::Failure { class }),
                    last: Some(execution),
                    checks: Vec::new(),
                    exit_code: ExitCode::for_status(class),
                });
            }
            let outcome = self.command(request, &decision, timeout)?;
            return Ok(self.finish(decision, outcome, Some(record)));
        }

        let outcome = self.command(request, &decision, timeout)?;
        Ok(self.finish(decision, outcome, None))
    }

    fn command(
        &self,
        request: &FlowRequest,
        decision: &RoutingDecision,
        timeout: Duration,
    ) -> Result<FlowOutcome, HostflowError> {
        let (window, tab) = (decision.window, decision.tab.as_str());
        let kind = request.command.kind();

        match &request.command {
            FlowCommand::Exec { command, raw_json } => {
                let invocation = CommandInvocation::new(
                    kind,
                    HostOperation::Exec,
                    host::exec_args(window, tab, command, *raw_json),
                    timeout,
                )
                .builder_related(host::is_builder_command(command));
                self.single(Some(decision), Stage::Command, &invocation)
            }
            FlowCommand::Call { tool, json_arg } => {
                let invocation = CommandInvocation::new(
                    kind,
                    HostOperation::Call,
                    host::call_args(window, tab, tool, json_arg.as_deref()),
                    timeout,
                );
                self.single(Some(decision), Stage::Command, &invocation)
            }
            FlowCommand::Export { select_set, out } => {
                remove_existing(out);
                let invocation = export_invocation(window, tab, select_set, out, timeout);
                self.single(Some(decision), Stage::Command, &invocation)
            }
            FlowCommand::PlanExport {
                select_set,
                task,
                out,
                recovery,
            } => {
                let chain = BuilderChain {
                    preflight: Vec::new(),
                    builder: plan_invocation(window, tab, select_set, task, out, timeout),
                    fallback: export_invocation(window, tab, select_set, out, timeout),
                    out_path: out.clone(),
                };
                self.chain(decision, &chain, recovery)
            }
            FlowCommand::Autopilot {
                select_set,
                task,
                out,
                recovery,
                preflight_timeout,
            } => {
                let check_timeout =
                    hostflow_config::resolve(request.profile, CommandKind::Preflight, *preflight_timeout)?;
                let chain = BuilderChain {
                    preflight: preflight_invocations(window, tab, check_timeout),
                    builder: plan_invocation(window, tab, select_set, task, out, timeout),
                    fallback: export_invocation(window, tab, select_set, out, timeout),
                    out_path: out.clone(),
                };
                self.chain(decision, &chain, recovery)
            }
            FlowCommand::Smoke => self.smoke(decision, timeout),
            FlowCommand::ToolsSchema { group } => self.single(
                Some(decision),
                Stage::Command,
                &schema_invocation(group.as_deref(), timeout),
            ),
        }
    }

    fn single(
        &self,
        decision: Option<&RoutingDecision>,
        stage: Stage,
        invocation: &CommandInvocation,
    ) -> Result<FlowOutcome, HostflowError> {
        let (execution, record) = self.attempt(stage, invocation)?;
        let status = execution.outcome.status;
        let final_status = if status.is_success() {
            FinalStatus::Success {
                via: SuccessKind::Full,
            }
        } else {
            FinalStatus::Failure { class: status }
        };
        Ok(FlowOutcome {
            routing: decision.cloned(),
            run: ResilienceRun::new(vec![record], final_status),
            last: Some(execution),
            checks: Vec::new(),
            exit_code: ExitCode::for_final_status(final_status),
        })
    }

    fn chain(
        &self,
        decision: &RoutingDecision,
        chain: &BuilderChain,
        recovery: &RecoveryPolicy,
    ) -> Result<FlowOutcome, HostflowError> {
        let result = ResilienceController::new(&self.executor, recovery).run(chain)?;
        let exit_code = ExitCode::for_final_status(result.run.final_status);
        Ok(FlowOutcome {
            routing: Some(decision.clone()),
            run: result.run,
            last: result.last,
            checks: result.preflight,
            exit_code,
        })
    }

    /// All three checks always run. Any failure exits 1.
    fn smoke(&self, decision: &RoutingDecision, timeout: Duration) -> Result<FlowOutcome, HostflowError> {
        let mut attempts = Vec::new();
        let mut checks = Vec::new();
        let mut first_failure = None;
        let mut last = None;

        for (check, invocation) in preflight_invocations(decision.window, &decision.tab, timeout) {
            let (execution, record) = self.attempt(Stage::Preflight(check), &invocation)?;
            let passed = execution.outcome.is_success();
            if !passed && first_failure.is_none() {
                first_failure = Some(execution.outcome.status);
            }
            checks.push((check, passed));
            attempts.push(record);
            last = Some(execution);
        }

        let (final_status, exit_code) = match first_failure {
            None => (
                FinalStatus::Success {
                    via: SuccessKind::Full,
                },
                ExitCode::SUCCESS,
            ),
            Some(class) => (FinalStatus::Failure { class }, ExitCode::INTERNAL),
        };
        Ok(FlowOutcome {
            routing: Some(decision.clone()),
            run: ResilienceRun::new(attempts, final_status),
            last,
            checks,
            exit_code,
        })
    }

    fn attempt(
        &self,
        stage: Stage,
        invocation: &CommandInvocation,
    ) -> Result<(Execution, StageRecord), HostflowError> {
        let _span = stage_span(stage, invocation.kind, invocation.timeout).entered();
        let execution = self.executor.run(invocation)?;
        log_stage_outcome(stage, &execution.outcome);
        let record = StageRecord {
            stage,
            kind: invocation.kind,
            timeout_ms: invocation.timeout.as_millis() as u64,
            outcome: execution.outcome.clone(),
        };
        Ok((execution, record))
    }

    /// Prepend the workspace switch, then persist the target on success.
    fn finish(
        &self,
        decision: RoutingDecision,
        mut outcome: FlowOutcome,
        switch: Option<StageRecord>,
    ) -> FlowOutcome {
        if let Some(record) = switch {
            outcome.run.attempts.insert(0, record);
        }
        if outcome.run.final_status.is_success() {
            if let Err(e) = self.store.save(&RoutingState::from_decision(&decision)) {
                tracing::warn!("{e}");
            }
        } else {
            tracing::debug!("run did not succeed; routing state left unchanged");
        }
        outcome.routing = Some(decision);
        outcome
    }
}

fn schema_invocation(group: Option<&str>, timeout: Duration) -> CommandInvocation {
    CommandInvocation::new(
        CommandKind::ToolsSchema,
        HostOperation::ToolsSchema,
        host::tools_schema_args(group),
        timeout,
    )
}

fn export_invocation(
    window: u32,
    tab: &str,
    select_set: &[String],
    out: &Utf8Path,
    timeout: Duration,
) -> CommandInvocation {
    CommandInvocation::new(
        CommandKind::Export,
        HostOperation::Export,
        host::exec_args(
            window,
            tab,
            &host::selection_export_command(select_set, out.as_str()),
            false,
        ),
        timeout,
    )
}

fn plan_invocation(
    window: u32,
    tab: &str,
    select_set: &[String],
    task: &str,
    out: &Utf8Path,
    timeout: Duration,
) -> CommandInvocation {
    CommandInvocation::new(
        CommandKind::PlanExport,
        HostOperation::PlanExport,
        host::exec_args(
            window,
            tab,
            &host::plan_export_command(select_set, task, out.as_str()),
            false,
        ),
        timeout,
    )
    .builder_related(true)
}

fn preflight_invocations(
    window: u32,
    tab: &str,
    timeout: Duration,
) -> Vec<(PreflightCheck, CommandInvocation)> {
    PreflightCheck::ALL
        .iter()
        .map(|&check| {
            let args = match check {
                PreflightCheck::Tabs => host::exec_args(window, tab, host::TABS_CHECK_COMMAND, false),
                PreflightCheck::Context => {
                    host::exec_args(window, tab, host::CONTEXT_CHECK_COMMAND, false)
                }
                PreflightCheck::ToolsSchema => host::tools_schema_args(None),
            };
            let invocation = CommandInvocation::new(
                CommandKind::Preflight,
                HostOperation::Preflight(check),
                args,
                timeout,
            );
            (check, invocation)
        })
        .collect()
}

fn remove_existing(path: &Utf8Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path, "removed previous output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path, error = %e, "could not remove previous output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::test_support::FakeHost;
    use hostflow_runner::ProcessOutput;
    use hostflow_utils::error::RoutingError;
    use hostflow_utils::types::ExecutionStatus;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
            Self { _dir: dir, root }
        }

        fn store(&self) -> RoutingStateStore {
            RoutingStateStore::new(self.root.join("state.json"))
        }

        fn engine<'a>(&self, host: &'a FakeHost, default_ws: Option<&str>) -> Engine<&'a FakeHost> {
            Engine::new(
                Executor::new(host, "rp-cli", Classifier::new(600)),
                self.store(),
                default_ws.map(str::to_string),
            )
        }

        fn remember(&self, window: u32, workspace: Option<&str>) {
            self.store()
                .save(&RoutingState {
                    window: Some(window),
                    tab: "T1".to_string(),
                    workspace: workspace.map(str::to_string),
                    updated_at: chrono::Utc::now(),
                })
                .unwrap();
        }
    }

    fn request(command: FlowCommand) -> FlowRequest {
        FlowRequest {
            command,
            routing: RoutingRequest::default(),
            profile: ProfileName::Normal,
            timeout: None,
        }
    }

    fn exec(command: &str) -> FlowCommand {
        FlowCommand::Exec {
            command: command.to_string(),
            raw_json: false,
        }
    }

    fn plan(fx: &Fixture, recovery: RecoveryPolicy) -> FlowCommand {
        FlowCommand::PlanExport {
            select_set: vec!["src/".to_string()],
            task: "draft".to_string(),
            out: fx.root.join("out.md"),
            recovery,
        }
    }

    #[test]
    fn test_ambiguous_windows_fail_before_any_command() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1, 2], &["T1"]);
        let err = fx.engine(&host, None).run(&request(exec("tree"))).unwrap_err();

        match err {
            HostflowError::Routing(RoutingError::AmbiguousRouting { candidates }) => {
                assert_eq!(candidates, [1, 2]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(host.calls().iter().all(|c| !c.contains("tree")));
        assert!(fx.store().load().is_none());
    }

    #[test]
    fn test_listing_timeout_exits_as_timeout() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("-e windows", [ProcessOutput::timed_out("", "")]);

        let err = fx.engine(&host, None).run(&request(exec("tree"))).unwrap_err();
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.to_exit_code(), ExitCode::TIMEOUT);
        assert!(host.calls().iter().all(|c| !c.contains("tree")));
    }

    #[test]
    fn test_killed_tab_listing_exits_as_timeout() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("-e tabs", [ProcessOutput::force_killed("", "")]);

        let err = fx.engine(&host, None).run(&request(exec("tree"))).unwrap_err();
        assert!(matches!(
            err,
            HostflowError::ListingTimedOut { status: ExecutionStatus::SignalKilled, .. }
        ));
        assert_eq!(err.to_exit_code(), ExitCode::TIMEOUT);
    }

    #[test]
    fn test_remembered_window_is_reused_and_saved() {
        let fx = Fixture::new();
        fx.remember(3, None);
        let host = FakeHost::new(&[1, 3], &["T1"]);

        let outcome = fx.engine(&host, None).run(&request(exec("tree"))).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
        assert_eq!(outcome.routing.unwrap().window, 3);
        assert!(host.calls().iter().any(|c| c == "-w 3 -t T1 -e tree"));
        assert_eq!(fx.store().load().unwrap().window, Some(3));
    }

    #[test]
    fn test_failed_command_leaves_state_untouched() {
        let fx = Fixture::new();
        fx.remember(3, Some("GitHub"));
        let before = fx.store().load();
        let host = FakeHost::new(&[3, 4], &["T1"])
            .respond("-e tree", [ProcessOutput::exited(2, "", "boom")]);
        let mut req = request(exec("tree"));
        req.routing.window = Some(4);

        let outcome = fx.engine(&host, None).run(&req).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::TOOL_FAILURE);
        assert_eq!(fx.store().load(), before);
    }

    #[test]
    fn test_builder_exec_timeout_is_builder_timeout() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("builder ", [ProcessOutput::timed_out("", "")]);

        let outcome = fx
            .engine(&host, None)
            .run(&request(exec("builder \"x\" --type plan")))
            .unwrap();
        assert_eq!(
            outcome.run.final_status,
            FinalStatus::Failure {
                class: ExecutionStatus::BuilderTimeout
            }
        );
        assert_eq!(outcome.exit_code, ExitCode::TIMEOUT);
    }

    #[test]
    fn test_workspace_switch_runs_first() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"]);
        let mut req = request(exec("tree"));
        req.routing.workspace = Some("GitHub".to_string());

        let outcome = fx.engine(&host, None).run(&req).unwrap();
        let stages: Vec<_> = outcome.run.attempts.iter().map(|a| a.stage).collect();
        assert_eq!(stages, [Stage::WorkspaceSwitch, Stage::Command]);
        let calls = host.calls();
        let switch = calls.iter().position(|c| c.contains("workspace switch \"GitHub\"")).unwrap();
        let tree = calls.iter().position(|c| c.ends_with("-e tree")).unwrap();
        assert!(switch < tree);
        assert_eq!(fx.store().load().unwrap().workspace.as_deref(), Some("GitHub"));
    }

    #[test]
    fn test_already_active_workspace_is_success() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"]).respond(
            "workspace switch",
            [ProcessOutput::exited(1, "", "Error: Already on workspace GitHub")],
        );
        let outcome = fx.engine(&host, Some("GitHub")).run(&request(exec("tree"))).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
        assert_eq!(
            outcome.run.attempts[0].outcome.note.as_deref(),
            Some("workspace_already_active")
        );
    }

    #[test]
    fn test_failed_workspace_switch_is_terminal() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("workspace switch", [ProcessOutput::exited(1, "", "no such workspace")]);
        let mut req = request(exec("tree"));
        req.routing.workspace = Some("Nope".to_string());

        let outcome = fx.engine(&host, None).run(&req).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::TOOL_FAILURE);
        assert_eq!(outcome.run.attempts.len(), 1);
        assert!(host.calls().iter().all(|c| !c.ends_with("-e tree")));
    }

    #[test]
    fn test_plan_export_fallback_after_retry() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("builder ", [ProcessOutput::timed_out("", "")])
            .respond("prompt export", [ProcessOutput::exited(0, "exported", "")]);
        let recovery = RecoveryPolicy {
            retry_on_timeout: true,
            fallback_export_on_timeout: true,
            ..RecoveryPolicy::default()
        };

        let outcome = fx.engine(&host, None).run(&request(plan(&fx, recovery))).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
        assert!(outcome.run.retried);
        assert!(outcome.run.fell_back);
        assert_eq!(
            outcome.run.final_status,
            FinalStatus::Success {
                via: SuccessKind::Fallback
            }
        );
        assert_eq!(
            host.timeouts().into_iter().filter(|t| *t > Duration::from_secs(30)).collect::<Vec<_>>(),
            [Duration::from_secs(120), Duration::from_secs(180), Duration::from_secs(120)]
        );
        assert!(fx.store().load().is_some());
    }

    #[test]
    fn test_plan_export_timeout_without_recovery() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("builder ", [ProcessOutput::timed_out("", "")]);

        let outcome = fx
            .engine(&host, None)
            .run(&request(plan(&fx, RecoveryPolicy::default())))
            .unwrap();
        assert_eq!(outcome.exit_code, ExitCode::TIMEOUT);
        assert_eq!(outcome.run.attempts.len(), 1);
        assert!(fx.store().load().is_none());
    }

    #[test]
    fn test_export_removes_previous_output() {
        let fx = Fixture::new();
        let out = fx.root.join("out.md");
        std::fs::write(&out, "old").unwrap();
        let host = FakeHost::new(&[1], &["T1"]);

        let outcome = fx
            .engine(&host, None)
            .run(&request(FlowCommand::Export {
                select_set: vec!["a.rs".to_string(), "b.rs".to_string()],
                out: out.clone(),
            }))
            .unwrap();
        assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
        assert!(!out.exists());
        assert!(host.calls().iter().any(|c| c.contains(
            "select clear && select add \"a.rs\" && select add \"b.rs\" && prompt export"
        )));
    }

    #[test]
    fn test_autopilot_skips_builder_when_preflight_fails() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("-e context", [ProcessOutput::exited(1, "", "no context")]);
        let command = FlowCommand::Autopilot {
            select_set: vec!["src/".to_string()],
            task: "draft".to_string(),
            out: fx.root.join("out.md"),
            recovery: RecoveryPolicy::default(),
            preflight_timeout: Some(Duration::from_secs(7)),
        };

        let outcome = fx.engine(&host, None).run(&request(command)).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::TOOL_FAILURE);
        assert!(host.calls().iter().all(|c| !c.contains("builder ")));
        assert_eq!(outcome.checks.len(), 3);
        assert!(host.timeouts().contains(&Duration::from_secs(7)));
    }

    #[test]
    fn test_smoke_reports_each_check() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"])
            .respond("--tools-schema", [ProcessOutput::exited(3, "", "schema error")]);

        let outcome = fx.engine(&host, None).run(&request(FlowCommand::Smoke)).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::INTERNAL);
        assert_eq!(
            outcome.checks,
            [
                (PreflightCheck::Tabs, true),
                (PreflightCheck::Context, true),
                (PreflightCheck::ToolsSchema, false)
            ]
        );
        assert!(fx.store().load().is_none());
    }

    #[test]
    fn test_smoke_success_saves_state() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[5], &["T1"]);
        let outcome = fx.engine(&host, None).run(&request(FlowCommand::Smoke)).unwrap();
        assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
        assert_eq!(fx.store().load().unwrap().window, Some(5));
    }

    #[test]
    fn test_tools_schema_needs_no_routing() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1, 2], &["T1"]);
        let outcome = fx
            .engine(&host, None)
            .run(&request(FlowCommand::ToolsSchema {
                group: Some("selection".to_string()),
            }))
            .unwrap();
        assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
        assert!(outcome.routing.is_none());
        assert_eq!(host.calls(), ["--tools-schema=selection"]);
        assert!(fx.store().load().is_none());
    }

    #[test]
    fn test_strict_mode_makes_no_host_calls() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"]);
        let mut req = request(exec("tree"));
        req.routing.strict = true;
        req.routing.window = Some(1);

        let err = fx.engine(&host, None).run(&req).unwrap_err();
        assert_eq!(err.kind(), "strict_routing_required");
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_zero_timeout_is_config_error() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"]);
        let mut req = request(exec("tree"));
        req.timeout = Some(Duration::ZERO);
        let err = fx.engine(&host, None).run(&req).unwrap_err();
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_oversized_timeouts_are_config_errors() {
        let fx = Fixture::new();
        let host = FakeHost::new(&[1], &["T1"]);
        let huge = Duration::from_secs(10_000_000_000_000);

        let mut req = request(exec("tree"));
        req.timeout = Some(huge);
        let err = fx.engine(&host, None).run(&req).unwrap_err();
        assert_eq!(err.kind(), "config");

        let req = request(plan(
            &fx,
            RecoveryPolicy {
                retry_on_timeout: true,
                retry_timeout: Some(huge),
                ..RecoveryPolicy::default()
            },
        ));
        let err = fx.engine(&host, None).run(&req).unwrap_err();
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
        assert!(host.calls().is_empty());
    }
}
