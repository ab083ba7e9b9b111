//! CLI entry point and dispatch.
//!
//! `run()` owns all output, including errors, and returns the exit code for
//! `main` to apply.

use clap::Parser;
use hostflow_config::{CliArgs, Config, ProfileName};
use hostflow_engine::Engine;
use hostflow_receipt::ReportBuilder;
use hostflow_utils::ExitCode;
use hostflow_utils::error::HostflowError;
use hostflow_utils::logging::init_tracing;

use super::args::Cli;
use super::commands;

/// Parse arguments, run the command, print results and emit the report.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: logging is unavailable: {e}");
    }

    let code = execute(&cli);
    if code == ExitCode::SUCCESS {
        Ok(())
    } else {
        Err(code)
    }
}

fn execute(cli: &Cli) -> ExitCode {
    let run_args = cli.command.run_args();
    let report_path = run_args.report_json.as_deref();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        profile: run_args.profile.clone(),
        retry_timeout_scale: cli
            .command
            .recovery_args()
            .and_then(|r| r.retry_timeout_scale),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let profile = run_args.profile.as_deref().unwrap_or(ProfileName::default().as_str());
            let summary = commands::invocation_summary(
                &cli.command,
                profile,
                run_args.timeout.map_or(0, |t| t.as_millis() as u64),
            );
            return fail_early(
                ReportBuilder::new(cli.command.kind(), summary),
                &HostflowError::from(err),
                report_path,
            );
        }
    };

    let request = commands::build_request(&cli.command, &config);
    let kind = cli.command.kind();
    let timeout_ms = hostflow_config::resolve(config.profile, kind, request.timeout)
        .map_or(0, |t| t.as_millis() as u64);
    let mut report = ReportBuilder::new(
        kind,
        commands::invocation_summary(&cli.command, config.profile.as_str(), timeout_ms),
    );

    let engine = match Engine::native(&config) {
        Ok(engine) => engine,
        Err(err) => return fail_early(report, &err, report_path),
    };

    let outcome = match engine.run(&request) {
        Ok(outcome) => outcome,
        Err(err) => return fail_early(report, &err, report_path),
    };

    commands::print_outcome(&outcome);

    if let Some(decision) = outcome.routing.clone() {
        report.routing(decision);
    }
    report.run(outcome.run.clone());
    if let Some(out) = request.command.out_path() {
        report.artifact_at(out);
    }

    commands::write_report(report, outcome.exit_code, report_path);
    outcome.exit_code
}

/// No attempt was made: print the error and still emit a report.
fn fail_early(
    mut report: ReportBuilder,
    err: &HostflowError,
    report_path: Option<&camino::Utf8Path>,
) -> ExitCode {
    commands::print_error(err);
    report.error(err);
    let code = err.to_exit_code();
    commands::write_report(report, code, report_path);
    code
}
