use anyhow::{Context, Result};
use hostflow_utils::types::RunReport;

/// Serialize a report as JCS canonical JSON (RFC 8785).
pub fn emit_report_jcs(report: &RunReport) -> Result<String> {
    let json_value =
        serde_json::to_value(report).with_context(|| "Failed to serialize report to JSON value")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize report JSON")?;
    String::from_utf8(json_bytes).with_context(|| "Canonical report JSON is not valid UTF-8")
}
