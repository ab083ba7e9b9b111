//! Well-known locations for hostflow's configuration and routing state.
//!
//! Resolution order for the hostflow home directory:
//! 1) thread-local override (tests only)
//! 2) env `HOSTFLOW_HOME`
//! 3) `<platform config dir>/hostflow`

use camino::Utf8PathBuf;
use std::cell::RefCell;

/// Environment variable that relocates both the config file and the state file.
pub const HOME_ENV: &str = "HOSTFLOW_HOME";

pub const STATE_FILE_NAME: &str = "state.json";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Directory holding `config.toml` and `state.json`, if one can be determined.
#[must_use]
pub fn hostflow_home() -> Option<Utf8PathBuf> {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return Some(tl);
    }
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Utf8PathBuf::from_path_buf(home.into()).ok();
    }
    dirs::config_dir()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .map(|dir| dir.join("hostflow"))
}

/// Returns `<home>/state.json`
#[must_use]
pub fn default_state_path() -> Option<Utf8PathBuf> {
    hostflow_home().map(|home| home.join(STATE_FILE_NAME))
}

/// Returns `<home>/config.toml`
#[must_use]
pub fn default_config_path() -> Option<Utf8PathBuf> {
    hostflow_home().map(|home| home.join(CONFIG_FILE_NAME))
}

#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl HomeGuard {
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.inner.path().to_path_buf())
            .expect("temp dir path is UTF-8")
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

/// Test helper: points the hostflow home at a fresh temp dir for this thread.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let td = tempfile::TempDir::new().expect("create temp home");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("temp dir path is UTF-8");
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    HomeGuard { inner: td }
}
