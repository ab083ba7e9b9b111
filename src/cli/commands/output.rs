//! Everything the CLI prints or writes after a run.

use camino::Utf8Path;
use hostflow_engine::FlowOutcome;
use hostflow_receipt::{ReportBuilder, emit};
use hostflow_utils::ExitCode;
use hostflow_utils::error::{HostflowError, UserFriendlyError};
use hostflow_utils::logging::stage_failure_hint;
use std::io::Write;

/// Contextual error report on stderr.
pub fn print_error(err: &HostflowError) {
    eprintln!("error: {}", err.user_message());
    if let Some(context) = err.context() {
        eprintln!("  {context}");
    }
    for suggestion in err.suggestions() {
        eprintln!("  hint: {suggestion}");
    }
}

/// Failure hints for each failed stage, smoke check lines, the resume note,
/// then the last stage's own output.
pub fn print_outcome(outcome: &FlowOutcome) {
    for attempt in &outcome.run.attempts {
        if !attempt.outcome.is_success() {
            eprintln!("{}", stage_failure_hint(attempt.stage, &attempt.outcome));
        }
    }

    if let Some(err) = &outcome.run.resume_error {
        eprintln!("hostflow resume: {err}");
    }

    if let Some(last) = &outcome.last {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(last.stdout.as_bytes());
        if !last.stdout.is_empty() && !last.stdout.ends_with('\n') {
            let _ = writeln!(stdout);
        }
        let _ = stdout.flush();
        if !last.stderr.is_empty() {
            eprint!("{}", last.stderr);
            if !last.stderr.ends_with('\n') {
                eprintln!();
            }
        }
    }

    for (check, passed) in &outcome.checks {
        println!("{}: {}", check.as_str(), if *passed { "ok" } else { "fail" });
    }

    if let Some(from) = outcome.run.resumed_from.as_deref().filter(|_| outcome.run.resumed) {
        println!("hostflow resume: reused export from {from}");
    }
}

/// Seal and write the report. A write failure is logged and never changes the
/// exit code.
pub fn write_report(builder: ReportBuilder, exit_code: ExitCode, destination: Option<&Utf8Path>) {
    let report = builder.finish(exit_code);
    match emit(&report, destination) {
        Ok(Some(path)) => tracing::debug!(path = %path, "run report written"),
        Ok(None) => {}
        Err(err) => tracing::error!("{err}"),
    }
}
