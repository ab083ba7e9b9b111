//! Last-good routing state, persisted across invocations.
//!
//! The file is an external key-value resource: loads tolerate absence and
//! corruption, saves replace the file atomically.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use hostflow_utils::atomic_write::write_file_atomic;
use hostflow_utils::error::StateError;
use hostflow_utils::types::RoutingDecision;
use serde::{Deserialize, Serialize};

/// Target of the last fully successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingState {
    #[serde(rename = "last_window")]
    pub window: Option<u32>,
    #[serde(rename = "last_tab")]
    pub tab: String,
    #[serde(rename = "last_workspace")]
    pub workspace: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RoutingState {
    #[must_use]
    pub fn from_decision(decision: &RoutingDecision) -> Self {
        Self {
            window: Some(decision.window),
            tab: decision.tab.clone(),
            workspace: decision.workspace.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingStateStore {
    path: Utf8PathBuf,
}

impl RoutingStateStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the stored state. Missing or unparsable files yield `None`; the
    /// latter is logged as unreadable state and otherwise ignored.
    #[must_use]
    pub fn load(&self) -> Option<RoutingState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                self.warn_unreadable(e.to_string());
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                self.warn_unreadable(e.to_string());
                None
            }
        }
    }

    fn warn_unreadable(&self, reason: String) {
        let err = StateError::Unreadable {
            path: self.path.to_string(),
            reason,
        };
        tracing::warn!("{err}; continuing without routing history");
    }

    /// Atomically replace the stored state.
    pub fn save(&self, state: &RoutingState) -> Result<(), StateError> {
        let write_failed = |reason: String| StateError::WriteFailed {
            path: self.path.to_string(),
            reason,
        };
        let content = serde_json::to_string_pretty(state).map_err(|e| write_failed(e.to_string()))?;
        write_file_atomic(&self.path, &format!("{content}\n"))
            .map_err(|e| write_failed(format!("{e:#}")))?;
        tracing::debug!(path = %self.path, window = ?state.window, tab = %state.tab, "routing state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostflow_utils::types::WindowSource;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> RoutingStateStore {
        RoutingStateStore::new(
            Utf8PathBuf::from_path_buf(dir.path().join("hostflow/state.json")).unwrap(),
        )
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load(), None);
    }

    #[test]
    fn test_corrupt_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{\"last_window\": ").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let decision = RoutingDecision {
            window: 3,
            window_source: WindowSource::Explicit,
            tab: "T1".to_string(),
            workspace: Some("GitHub".to_string()),
            workspace_source: None,
            strict: false,
        };
        let state = RoutingState::from_decision(&decision);

        store.save(&state).unwrap();
        assert_eq!(store.load(), Some(state));
    }

    #[test]
    fn test_on_disk_field_names() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let state = RoutingState {
            window: Some(7),
            tab: "Notes".to_string(),
            workspace: None,
            updated_at: Utc::now(),
        };
        store.save(&state).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["last_window"], 7);
        assert_eq!(value["last_tab"], "Notes");
        assert!(value["last_workspace"].is_null());
        assert!(value["updated_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_reads_state_written_by_other_tools() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"last_window": 3, "last_tab": "T1", "last_workspace": "GitHub", "updated_at": "2026-01-02T03:04:05.123456+00:00"}"#,
        )
        .unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.window, Some(3));
        assert_eq!(state.workspace.as_deref(), Some("GitHub"));
    }
}
