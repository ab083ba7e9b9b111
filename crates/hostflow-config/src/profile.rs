//! Execution profiles: named timeout tables.
//!
//! | kind | fast | normal | deep |
//! |------|------|--------|------|
//! | exec | 45 | 60 | 90 |
//! | call | 45 | 60 | 90 |
//! | tools_schema | 30 | 60 | 90 |
//! | export | 60 | 90 | 150 |
//! | plan_export | 90 | 120 | 240 |
//! | autopilot | 90 | 120 | 240 |
//! | preflight | 25 | 45 | 90 |
//! | smoke | 25 | 45 | 90 |
//!
//! Values are seconds.

use hostflow_utils::error::ConfigError;
use hostflow_utils::types::CommandKind;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProfileName {
    Fast,
    #[default]
    Normal,
    Deep,
}

impl ProfileName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProfileName::Fast => "fast",
            ProfileName::Normal => "normal",
            ProfileName::Deep => "deep",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(ProfileName::Fast),
            "normal" => Ok(ProfileName::Normal),
            "deep" => Ok(ProfileName::Deep),
            _ => Err(ConfigError::UnknownProfile {
                name: s.to_string(),
            }),
        }
    }
}

const fn table_secs(profile: ProfileName, kind: CommandKind) -> u64 {
    let (fast, normal, deep) = match kind {
        CommandKind::Exec | CommandKind::Call => (45, 60, 90),
        CommandKind::ToolsSchema => (30, 60, 90),
        CommandKind::Export => (60, 90, 150),
        CommandKind::PlanExport | CommandKind::Autopilot => (90, 120, 240),
        CommandKind::Preflight | CommandKind::Smoke => (25, 45, 90),
    };
    match profile {
        ProfileName::Fast => fast,
        ProfileName::Normal => normal,
        ProfileName::Deep => deep,
    }
}

/// Longest timeout any stage may be given (one day).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Immutable per-invocation timeout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionProfile {
    name: ProfileName,
}

impl ExecutionProfile {
    #[must_use]
    pub const fn new(name: ProfileName) -> Self {
        Self { name }
    }

    #[must_use]
    pub const fn name(&self) -> ProfileName {
        self.name
    }

    #[must_use]
    pub const fn timeout(&self, kind: CommandKind) -> Duration {
        Duration::from_secs(table_secs(self.name, kind))
    }
}

/// Timeout for `kind` under `profile`. An explicit value wins but must be
/// non-zero and at most [`MAX_TIMEOUT`].
pub fn resolve(
    profile: ProfileName,
    kind: CommandKind,
    explicit: Option<Duration>,
) -> Result<Duration, ConfigError> {
    match explicit {
        Some(timeout) => check_timeout("timeout", timeout),
        None => Ok(ExecutionProfile::new(profile).timeout(kind)),
    }
}

/// Reject a caller-supplied timeout of zero or above [`MAX_TIMEOUT`].
pub fn check_timeout(key: &str, timeout: Duration) -> Result<Duration, ConfigError> {
    let reason = if timeout.is_zero() {
        "timeout must be greater than zero".to_string()
    } else if timeout > MAX_TIMEOUT {
        format!("timeout must be at most {} seconds", MAX_TIMEOUT.as_secs())
    } else {
        return Ok(timeout);
    };
    Err(ConfigError::InvalidValue {
        key: key.to_string(),
        value: format!("{}", timeout.as_secs_f64()),
        reason,
    })
}
