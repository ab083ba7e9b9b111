//! Translation from parsed arguments to engine requests.

mod output;

pub use output::{print_error, print_outcome, write_report};

use hostflow_config::Config;
use hostflow_engine::host::split_select_set;
use hostflow_engine::{FlowCommand, FlowRequest, RecoveryPolicy, RoutingRequest};
use hostflow_utils::types::InvocationSummary;

use super::args::{Commands, RecoveryArgs, TargetArgs};

/// Build the engine request for `command` under the effective config.
#[must_use]
pub fn build_request(command: &Commands, config: &Config) -> FlowRequest {
    let flow = match command {
        Commands::Exec {
            command, raw_json, ..
        } => FlowCommand::Exec {
            command: command.clone(),
            raw_json: *raw_json,
        },
        Commands::Call { tool, json_arg, .. } => FlowCommand::Call {
            tool: tool.clone(),
            json_arg: json_arg.clone(),
        },
        Commands::Export { selection, .. } => FlowCommand::Export {
            select_set: split_select_set(&selection.select_set),
            out: selection.out.clone(),
        },
        Commands::PlanExport {
            selection,
            task,
            recovery,
            ..
        } => FlowCommand::PlanExport {
            select_set: split_select_set(&selection.select_set),
            task: task.clone(),
            out: selection.out.clone(),
            recovery: recovery_policy(recovery, config),
        },
        Commands::Autopilot {
            selection,
            task,
            recovery,
            preflight_timeout,
            ..
        } => FlowCommand::Autopilot {
            select_set: split_select_set(&selection.select_set),
            task: task.clone(),
            out: selection.out.clone(),
            recovery: recovery_policy(recovery, config),
            preflight_timeout: *preflight_timeout,
        },
        Commands::Smoke { .. } => FlowCommand::Smoke,
        Commands::ToolsSchema { group, .. } => FlowCommand::ToolsSchema {
            group: group.clone(),
        },
    };

    FlowRequest {
        command: flow,
        routing: command.target_args().map(routing_request).unwrap_or_default(),
        profile: config.profile,
        timeout: command.run_args().timeout,
    }
}

fn routing_request(target: &TargetArgs) -> RoutingRequest {
    RoutingRequest {
        window: target.window,
        tab: target.tab.clone(),
        workspace: target.workspace.clone(),
        strict: target.strict,
    }
}

/// The scale flag reaches the policy through the config, where it was
/// already merged and clamped.
fn recovery_policy(args: &RecoveryArgs, config: &Config) -> RecoveryPolicy {
    RecoveryPolicy {
        retry_on_timeout: args.retry_on_timeout,
        retry_timeout: args.retry_timeout,
        retry_timeout_scale: config.retry_timeout_scale,
        fallback_export_on_timeout: args.fallback_export_on_timeout,
        resume_from_export: args.resume_from_export.clone(),
        ..RecoveryPolicy::default()
    }
}

/// Request summary for the run report. `profile` is the effective profile
/// when configuration loaded, else whatever was passed on the command line.
#[must_use]
pub fn invocation_summary(command: &Commands, profile: &str, timeout_ms: u64) -> InvocationSummary {
    let target = command.target_args().cloned().unwrap_or_default();
    let recovery = command.recovery_args().cloned().unwrap_or_default();
    InvocationSummary {
        profile: profile.to_string(),
        timeout_ms,
        strict: target.strict,
        window: target.window,
        tab: target.tab,
        workspace: target.workspace,
        retry_on_timeout: recovery.retry_on_timeout,
        fallback_export_on_timeout: recovery.fallback_export_on_timeout,
        resume_from_export: recovery.resume_from_export.map(|p| p.to_string()),
    }
}
