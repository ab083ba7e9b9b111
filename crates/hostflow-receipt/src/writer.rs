use camino::{Utf8Path, Utf8PathBuf};
use hostflow_utils::atomic_write::write_file_atomic;
use hostflow_utils::error::HostflowError;
use hostflow_utils::types::RunReport;

use crate::emit::emit_report_jcs;

/// Write `report` to `destination`. With no destination nothing is written.
///
/// Returns the path written, if any.
pub fn emit(
    report: &RunReport,
    destination: Option<&Utf8Path>,
) -> Result<Option<Utf8PathBuf>, HostflowError> {
    let Some(path) = destination else {
        return Ok(None);
    };

    let report_write_failed = |e: anyhow::Error| HostflowError::ReportWrite {
        path: path.to_string(),
        reason: format!("{e:#}"),
    };

    let json_content = emit_report_jcs(report).map_err(report_write_failed)?;
    write_file_atomic(path, &json_content).map_err(report_write_failed)?;

    tracing::debug!(path = %path, "run report written");
    Ok(Some(path.to_path_buf()))
}
