//! Host tool argument contract and response parsing.
//!
//! Every function here produces argv elements; nothing is ever passed through
//! a shell. Chained exec text (`select clear && ...`) is interpreted by the
//! host tool itself and travels as a single argument.

use hostflow_utils::error::HostflowError;
use serde_json::Value;
use std::time::Duration;

/// Tab used when none is given.
pub const DEFAULT_TAB: &str = "T1";

/// Timeout for window and tab listings.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Exec text of the `tabs` health check.
pub const TABS_CHECK_COMMAND: &str = "tabs";

/// Exec text of the `context` health check.
pub const CONTEXT_CHECK_COMMAND: &str =
    "context --include tokens,selection,prompt --path-display relative";

#[must_use]
pub fn list_windows_args() -> Vec<String> {
    strings(["--raw-json", "-e", "windows"])
}

#[must_use]
pub fn list_tabs_args(window: u32) -> Vec<String> {
    strings(["--raw-json", "-w", &window.to_string(), "-e", "tabs"])
}

/// `[--raw-json] -w <id> -t <tab> -e <command>`
#[must_use]
pub fn exec_args(window: u32, tab: &str, command: &str, raw_json: bool) -> Vec<String> {
    let mut args = Vec::with_capacity(7);
    if raw_json {
        args.push("--raw-json".to_string());
    }
    args.extend(strings(["-w", &window.to_string(), "-t", tab, "-e", command]));
    args
}

/// `-w <id> -t <tab> -c <tool> [-j <json>]`
#[must_use]
pub fn call_args(window: u32, tab: &str, tool: &str, json_arg: Option<&str>) -> Vec<String> {
    let mut args = strings(["-w", &window.to_string(), "-t", tab, "-c", tool]);
    if let Some(json) = json_arg.filter(|j| !j.is_empty()) {
        args.extend(strings(["-j", json]));
    }
    args
}

/// `--tools-schema` or `--tools-schema=<group>`
#[must_use]
pub fn tools_schema_args(group: Option<&str>) -> Vec<String> {
    match group.filter(|g| !g.is_empty()) {
        Some(group) => vec![format!("--tools-schema={group}")],
        None => vec!["--tools-schema".to_string()],
    }
}

#[must_use]
pub fn workspace_switch_command(workspace: &str) -> String {
    format!("workspace switch \"{workspace}\"")
}

/// `select clear && select add "<p>" ... && prompt export "<out>"`
#[must_use]
pub fn selection_export_command(paths: &[String], out: &str) -> String {
    let mut chain = selection_chain(paths);
    chain.push(format!("prompt export \"{out}\""));
    chain.join(" && ")
}

/// Selection export with `builder "<task>" --type plan` before the export.
#[must_use]
pub fn plan_export_command(paths: &[String], task: &str, out: &str) -> String {
    let mut chain = selection_chain(paths);
    chain.push(format!("builder \"{task}\" --type plan"));
    chain.push(format!("prompt export \"{out}\""));
    chain.join(" && ")
}

fn selection_chain(paths: &[String]) -> Vec<String> {
    let mut chain = Vec::with_capacity(paths.len() + 3);
    chain.push("select clear".to_string());
    chain.extend(paths.iter().map(|p| format!("select add \"{p}\"")));
    chain
}

/// Split a comma-separated selection set, dropping blank entries.
#[must_use]
pub fn split_select_set(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Exec text that runs a builder job; such stages time out as `builder_timeout`.
#[must_use]
pub fn is_builder_command(command: &str) -> bool {
    command.contains("builder ")
}

/// Parse `--raw-json -e windows`: an array of objects carrying `windowID`.
pub fn parse_windows(stdout: &str) -> Result<Vec<u32>, HostflowError> {
    let payload: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| protocol("list windows", format!("invalid JSON: {e}")))?;
    let entries = payload
        .as_array()
        .ok_or_else(|| protocol("list windows", "expected a JSON array"))?;

    let mut ids: Vec<u32> = entries
        .iter()
        .filter_map(|entry| entry.get("windowID"))
        .filter_map(window_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

fn window_id(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse `--raw-json -w <id> -e tabs`: `{"tabs": [{"name": ...}]}`.
pub fn parse_tabs(stdout: &str) -> Result<Vec<String>, HostflowError> {
    let payload: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| protocol("list tabs", format!("invalid JSON: {e}")))?;
    let tabs = payload
        .get("tabs")
        .and_then(Value::as_array)
        .ok_or_else(|| protocol("list tabs", "expected an object with a `tabs` array"))?;

    Ok(tabs
        .iter()
        .filter_map(|tab| tab.get("name").and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

pub(crate) fn protocol(operation: &str, reason: impl Into<String>) -> HostflowError {
    HostflowError::HostProtocol {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
