//! Error taxonomy for hostflow.
//!
//! Each concern gets its own `thiserror` enum; [`HostflowError`] aggregates
//! them and maps every variant onto an [`ExitCode`]. Execution failures of the
//! host tool (non-zero exit, timeouts, signals) are not errors here: they are
//! classified into [`ExecutionStatus`](crate::types::ExecutionStatus) values
//! and flow through the recovery chain.

use crate::exit_codes::ExitCode;
use crate::types::ExecutionStatus;
use hostflow_runner::RunnerError;
use std::fmt;
use thiserror::Error;

/// Top-level error for library operations.
///
/// Library code returns `HostflowError` and never calls `std::process::exit()`;
/// the CLI maps it with [`to_exit_code`](Self::to_exit_code).
#[derive(Error, Debug)]
pub enum HostflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Host tool '{program}' is not available")]
    ToolUnavailable { program: String },

    #[error("Runner error: {0}")]
    Runner(RunnerError),

    #[error("Unexpected host tool response to {operation}: {reason}")]
    HostProtocol { operation: String, reason: String },

    /// A window or tab listing ended timeout-class before routing could finish.
    #[error("Host tool did not answer {operation} in time ({status})")]
    ListingTimedOut {
        operation: String,
        status: ExecutionStatus,
    },

    #[error("Resume artifact {path} cannot be used: {reason}")]
    ResumeArtifactMissing { path: String, reason: String },

    #[error("Report write failed at {path}: {reason}")]
    ReportWrite { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RunnerError> for HostflowError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::ProgramNotFound { program } => HostflowError::ToolUnavailable { program },
            other => HostflowError::Runner(other),
        }
    }
}

impl HostflowError {
    /// Map this error to the process exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            HostflowError::Config(_) | HostflowError::Routing(_) => ExitCode::CLI_ARGS,
            HostflowError::ToolUnavailable { .. } => ExitCode::TOOL_UNAVAILABLE,
            HostflowError::ListingTimedOut { status, .. } => ExitCode::for_status(*status),
            HostflowError::Runner(_) | HostflowError::HostProtocol { .. } => {
                ExitCode::TOOL_FAILURE
            }
            HostflowError::State(_)
            | HostflowError::ResumeArtifactMissing { .. }
            | HostflowError::ReportWrite { .. }
            | HostflowError::Io(_) => ExitCode::INTERNAL,
        }
    }

    /// Stable snake_case name used in run reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HostflowError::Config(_) => "config",
            HostflowError::Routing(RoutingError::AmbiguousRouting { .. }) => "ambiguous_routing",
            HostflowError::Routing(RoutingError::TabNotFound { .. }) => "tab_not_found",
            HostflowError::Routing(RoutingError::StrictRoutingRequired { .. }) => {
                "strict_routing_required"
            }
            HostflowError::State(_) => "state",
            HostflowError::ToolUnavailable { .. } => "tool_unavailable",
            HostflowError::Runner(_) => "runner",
            HostflowError::HostProtocol { .. } => "host_protocol",
            HostflowError::ListingTimedOut { status, .. } => status.as_str(),
            HostflowError::ResumeArtifactMissing { .. } => "resume_artifact_missing",
            HostflowError::ReportWrite { .. } => "report_write",
            HostflowError::Io(_) => "io",
        }
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Routing,
    HostTool,
    FileSystem,
    Recovery,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Routing => write!(f, "Routing"),
            Self::HostTool => write!(f, "Host Tool"),
            Self::FileSystem => write!(f, "File System"),
            Self::Recovery => write!(f, "Recovery"),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown profile '{name}' (expected fast, normal or deep)")]
    UnknownProfile { name: String },

    #[error("Invalid configuration value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("No default {what} location could be determined; set HOSTFLOW_HOME")]
    NoDefaultLocation { what: &'static str },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            ConfigError::UnknownProfile { name } => format!("Profile '{name}' does not exist"),
            ConfigError::InvalidValue { key, value, .. } => {
                format!("'{value}' is not a valid value for {key}")
            }
            ConfigError::InvalidFile { path, .. } => {
                format!("Configuration file {path} could not be loaded")
            }
            ConfigError::NotFound { path } => format!("Configuration file {path} does not exist"),
            ConfigError::NoDefaultLocation { what } => {
                format!("Could not determine where the {what} lives")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            ConfigError::InvalidValue { reason, .. } | ConfigError::InvalidFile { reason, .. } => {
                Some(reason.clone())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::UnknownProfile { .. } => {
                vec!["Use --profile fast, --profile normal or --profile deep".to_string()]
            }
            ConfigError::InvalidValue { key, .. } => {
                vec![format!("Check the value given for {key}")]
            }
            ConfigError::InvalidFile { .. } => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Known sections are [host], [routing] and [defaults]".to_string(),
            ],
            ConfigError::NotFound { .. } => {
                vec!["Pass an existing file to --config or omit the flag".to_string()]
            }
            ConfigError::NoDefaultLocation { .. } => {
                vec!["Set HOSTFLOW_HOME to a writable directory".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("{}", ambiguous_message(candidates))]
    AmbiguousRouting { candidates: Vec<u32> },

    #[error("Tab '{tab}' not found in window {window}; available tabs: {}", available.join(", "))]
    TabNotFound {
        window: u32,
        tab: String,
        available: Vec<String>,
    },

    #[error("Strict mode requires explicit {}", missing.join(", "))]
    StrictRoutingRequired { missing: Vec<&'static str> },
}

fn ambiguous_message(candidates: &[u32]) -> String {
    if candidates.is_empty() {
        return "No windows are open".to_string();
    }
    let ids: Vec<String> = candidates.iter().map(u32::to_string).collect();
    format!(
        "Multiple windows are open ({}); pass --window to choose one",
        ids.join(", ")
    )
}

impl UserFriendlyError for RoutingError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            RoutingError::AmbiguousRouting { candidates } if !candidates.is_empty() => Some(
                "No window was given and no remembered window is currently open".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            RoutingError::AmbiguousRouting { candidates } => match candidates.first() {
                Some(first) => vec![format!("Re-run with --window {first} (or another listed id)")],
                None => vec!["Open a window in the host application first".to_string()],
            },
            RoutingError::TabNotFound { available, .. } => match available.first() {
                Some(first) => vec![format!("Re-run with --tab {first} (or another listed tab)")],
                None => vec!["Open a tab in the selected window".to_string()],
            },
            RoutingError::StrictRoutingRequired { missing } => missing
                .iter()
                .map(|field| format!("Pass --{field}"))
                .collect(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Routing
    }
}

// ============================================================================
// Routing state
// ============================================================================

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Routing state at {path} is unreadable: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Failed to write routing state to {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

impl UserFriendlyError for StateError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            StateError::Unreadable { .. } => {
                Some("The remembered routing target is ignored for this run".to_string())
            }
            StateError::WriteFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            StateError::Unreadable { path, .. } => {
                vec![format!("Delete {path}; it is recreated after the next successful run")]
            }
            StateError::WriteFailed { .. } => {
                vec!["Check permissions of the state directory or set HOSTFLOW_HOME".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::FileSystem
    }
}

impl UserFriendlyError for HostflowError {
    fn user_message(&self) -> String {
        match self {
            HostflowError::Config(e) => e.user_message(),
            HostflowError::Routing(e) => e.user_message(),
            HostflowError::State(e) => e.user_message(),
            HostflowError::ToolUnavailable { program } => {
                format!("The host tool '{program}' could not be started")
            }
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            HostflowError::Config(e) => e.context(),
            HostflowError::Routing(e) => e.context(),
            HostflowError::State(e) => e.context(),
            HostflowError::ToolUnavailable { .. } => {
                Some("The binary was not found on PATH".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            HostflowError::Config(e) => e.suggestions(),
            HostflowError::Routing(e) => e.suggestions(),
            HostflowError::State(e) => e.suggestions(),
            HostflowError::ToolUnavailable { .. } => vec![
                "Install the host tool or add it to PATH".to_string(),
                "Set [host] binary in the configuration file".to_string(),
            ],
            HostflowError::HostProtocol { .. } | HostflowError::ListingTimedOut { .. } => {
                vec!["Check that the host application is running and responsive".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            HostflowError::Config(e) => e.category(),
            HostflowError::Routing(e) => e.category(),
            HostflowError::State(e) => e.category(),
            HostflowError::ToolUnavailable { .. }
            | HostflowError::Runner(_)
            | HostflowError::HostProtocol { .. }
            | HostflowError::ListingTimedOut { .. } => ErrorCategory::HostTool,
            HostflowError::ResumeArtifactMissing { .. } => ErrorCategory::Recovery,
            HostflowError::ReportWrite { .. } | HostflowError::Io(_) => ErrorCategory::FileSystem,
        }
    }
}
