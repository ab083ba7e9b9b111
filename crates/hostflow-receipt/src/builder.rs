use camino::Utf8Path;
use chrono::{DateTime, Utc};
use hostflow_utils::ExitCode;
use hostflow_utils::error::HostflowError;
use hostflow_utils::types::{
    ArtifactSummary, CommandKind, InvocationSummary, ReportError, ResilienceRun, RoutingDecision,
    RunReport,
};
use std::time::Instant;

/// Version of the report layout.
pub const REPORT_VERSION: u32 = 1;

/// Accumulates report fields while a command runs.
///
/// Start one as soon as the invocation is parsed so that early failures
/// (configuration, routing) still yield a report with `run: null` and an
/// `error` block.
#[derive(Debug)]
pub struct ReportBuilder {
    command: CommandKind,
    invocation: InvocationSummary,
    started_at: DateTime<Utc>,
    started: Instant,
    routing: Option<RoutingDecision>,
    run: Option<ResilienceRun>,
    artifact: Option<ArtifactSummary>,
    error: Option<ReportError>,
}

impl ReportBuilder {
    #[must_use]
    pub fn new(command: CommandKind, invocation: InvocationSummary) -> Self {
        Self {
            command,
            invocation,
            started_at: Utc::now(),
            started: Instant::now(),
            routing: None,
            run: None,
            artifact: None,
            error: None,
        }
    }

    pub fn routing(&mut self, decision: RoutingDecision) -> &mut Self {
        self.routing = Some(decision);
        self
    }

    pub fn run(&mut self, run: ResilienceRun) -> &mut Self {
        self.run = Some(run);
        self
    }

    /// Record what exists at the output path right now.
    pub fn artifact_at(&mut self, path: &Utf8Path) -> &mut Self {
        let metadata = std::fs::metadata(path).ok().filter(std::fs::Metadata::is_file);
        self.artifact = Some(ArtifactSummary {
            path: path.to_string(),
            exists: metadata.is_some(),
            bytes: metadata.map_or(0, |m| m.len()),
        });
        self
    }

    pub fn error(&mut self, err: &HostflowError) -> &mut Self {
        self.error = Some(ReportError {
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
        self
    }

    /// Seal the report with the process exit code.
    #[must_use]
    pub fn finish(self, exit_code: ExitCode) -> RunReport {
        RunReport {
            report_version: REPORT_VERSION,
            command: self.command,
            invocation: self.invocation,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            exit_code: exit_code.as_i32(),
            ok: exit_code == ExitCode::SUCCESS,
            routing: self.routing,
            run: self.run,
            artifact: self.artifact,
            error: self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{emit, emit_report_jcs};
    use camino::Utf8PathBuf;
    use hostflow_utils::error::RoutingError;
    use hostflow_utils::types::{
        ExecutionOutcome, ExecutionStatus, FinalStatus, Stage, StageRecord, SuccessKind,
        WindowSource,
    };
    use tempfile::TempDir;

    fn invocation() -> InvocationSummary {
        InvocationSummary {
            profile: "normal".to_string(),
            timeout_ms: 120_000,
            strict: false,
            window: None,
            tab: None,
            workspace: None,
            retry_on_timeout: true,
            fallback_export_on_timeout: true,
            resume_from_export: None,
        }
    }

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
            duration_ms: 10,
            note: None,
        }
    }

    fn fallback_run() -> ResilienceRun {
        let record = |stage, status, code| StageRecord {
            stage,
            kind: CommandKind::PlanExport,
            timeout_ms: 1_000,
            outcome: outcome(status, code),
        };
        ResilienceRun {
            attempts: vec![
                record(Stage::Builder, ExecutionStatus::BuilderTimeout, 124),
                record(Stage::BuilderRetry, ExecutionStatus::BuilderTimeout, 124),
                record(Stage::FallbackExport, ExecutionStatus::Success, 0),
            ],
            retried: true,
            fell_back: true,
            resumed: false,
            retry_timeout_ms: Some(1_500),
            resumed_from: None,
            resume_error: None,
            final_status: FinalStatus::Success {
                via: SuccessKind::Fallback,
            },
        }
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_successful_report_fields() {
        let mut builder = ReportBuilder::new(CommandKind::PlanExport, invocation());
        builder
            .routing(RoutingDecision {
                window: 3,
                window_source: WindowSource::LastGood,
                tab: "T1".to_string(),
                workspace: None,
                workspace_source: None,
                strict: false,
            })
            .run(fallback_run());
        let report = builder.finish(ExitCode::SUCCESS);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert!(report.ok);
        assert_eq!(report.exit_code, 0);
        assert!(report.finished_at >= report.started_at);

        let value: serde_json::Value =
            serde_json::from_str(&emit_report_jcs(&report).unwrap()).unwrap();
        assert_eq!(value["run"]["retried"], true);
        assert_eq!(value["run"]["fell_back"], true);
        assert_eq!(value["run"]["final_status"]["via"], "fallback");
        assert_eq!(value["run"]["stages"][1]["stage"], "builder_retry");
        assert_eq!(value["routing"]["window_source"], "last_good");
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_error_report_has_no_run() {
        let mut builder = ReportBuilder::new(CommandKind::Exec, invocation());
        builder.error(&RoutingError::AmbiguousRouting { candidates: vec![1, 2] }.into());
        let report = builder.finish(ExitCode::CLI_ARGS);

        assert!(!report.ok);
        assert!(report.run.is_none());
        let error = report.error.unwrap();
        assert_eq!(error.kind, "ambiguous_routing");
        assert!(error.message.contains("1, 2"));
    }

    #[test]
    fn test_artifact_summary() {
        let dir = TempDir::new().unwrap();
        let path = utf8(&dir).join("out.md");

        let mut builder = ReportBuilder::new(CommandKind::Export, invocation());
        builder.artifact_at(&path);
        let missing = builder.finish(ExitCode::TOOL_FAILURE).artifact.unwrap();
        assert!(!missing.exists);
        assert_eq!(missing.bytes, 0);

        std::fs::write(&path, "exported").unwrap();
        let mut builder = ReportBuilder::new(CommandKind::Export, invocation());
        builder.artifact_at(&path);
        let present = builder.finish(ExitCode::SUCCESS).artifact.unwrap();
        assert!(present.exists);
        assert_eq!(present.bytes, 8);
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let report = ReportBuilder::new(CommandKind::Smoke, invocation()).finish(ExitCode::SUCCESS);
        let json = emit_report_jcs(&report).unwrap();

        assert!(!json.contains('\n'));
        let artifact = json.find("\"artifact\"").unwrap();
        let command = json.find("\"command\"").unwrap();
        let report_version = json.find("\"report_version\"").unwrap();
        assert!(artifact < command && command < report_version);
    }

    #[test]
    fn test_emit_without_destination_writes_nothing() {
        let report = ReportBuilder::new(CommandKind::Exec, invocation()).finish(ExitCode::SUCCESS);
        assert_eq!(emit(&report, None).unwrap(), None);
    }

    #[test]
    fn test_emit_writes_parseable_report() {
        let dir = TempDir::new().unwrap();
        let path = utf8(&dir).join("reports/run.json");
        let report = ReportBuilder::new(CommandKind::Exec, invocation()).finish(ExitCode::TIMEOUT);

        let written = emit(&report, Some(&path)).unwrap();
        assert_eq!(written.as_deref(), Some(path.as_path()));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["exit_code"], 124);
        assert_eq!(value["ok"], false);
        assert_eq!(value["command"], "exec");
    }

    #[test]
    fn test_emit_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = utf8(&dir).join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("run.json");

        let report = ReportBuilder::new(CommandKind::Exec, invocation()).finish(ExitCode::SUCCESS);
        let err = emit(&report, Some(&path)).unwrap_err();
        assert!(matches!(err, HostflowError::ReportWrite { .. }));
    }
}
