use camino::Utf8PathBuf;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::profile::ProfileName;

pub const DEFAULT_HOST_BINARY: &str = "rp-cli";
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2_000;
pub const MAX_GRACE_PERIOD_MS: u64 = 10_000;
pub const DEFAULT_TAIL_BYTES: usize = 600;
pub const MIN_TAIL_BYTES: usize = 64;
pub const DEFAULT_RETRY_TIMEOUT_SCALE: f64 = 1.5;
pub const MAX_RETRY_TIMEOUT_SCALE: f64 = 100.0;

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    ConfigFile(Utf8PathBuf),
    Cli,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::ConfigFile(path) => write!(f, "config file ({path})"),
            Self::Cli => write!(f, "command line"),
        }
    }
}

/// Flags from the command line that override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub profile: Option<String>,
    pub retry_timeout_scale: Option<f64>,
}

/// On-disk TOML layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<HostSection>,
    pub routing: Option<RoutingSection>,
    pub defaults: Option<DefaultsSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    /// Host tool binary name or path
    pub binary: Option<String>,
    /// Wait between SIGTERM and SIGKILL on timeout
    pub grace_period_ms: Option<u64>,
    /// Bytes of stdout/stderr kept per stage in reports
    pub tail_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingSection {
    pub default_workspace: Option<String>,
    pub state_path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    pub profile: Option<String>,
    pub retry_timeout_scale: Option<f64>,
}

/// Effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub host_binary: String,
    pub grace_period: Duration,
    pub tail_bytes: usize,
    pub default_workspace: Option<String>,
    /// Explicit state file location; `None` means the default under the hostflow home.
    pub state_path: Option<Utf8PathBuf>,
    pub profile: ProfileName,
    pub retry_timeout_scale: f64,
    /// Config file that was loaded, if any
    pub config_path: Option<Utf8PathBuf>,
    pub source_attribution: HashMap<&'static str, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let source_attribution = [
            "host_binary",
            "grace_period_ms",
            "tail_bytes",
            "default_workspace",
            "state_path",
            "profile",
            "retry_timeout_scale",
        ]
        .into_iter()
        .map(|key| (key, ConfigSource::Defaults))
        .collect();

        Self {
            host_binary: DEFAULT_HOST_BINARY.to_string(),
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            tail_bytes: DEFAULT_TAIL_BYTES,
            default_workspace: None,
            state_path: None,
            profile: ProfileName::Normal,
            retry_timeout_scale: DEFAULT_RETRY_TIMEOUT_SCALE,
            config_path: None,
            source_attribution,
        }
    }
}

impl Config {
    /// Source of the value behind `key`, for diagnostics.
    #[must_use]
    pub fn source_of(&self, key: &str) -> Option<&ConfigSource> {
        self.source_attribution.get(key)
    }
}
