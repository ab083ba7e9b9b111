//! CLI argument definitions (clap derive).

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use hostflow_utils::types::CommandKind;
use std::time::Duration;

/// hostflow - deterministic routing and resilient execution for rp-cli
#[derive(Parser, Debug)]
#[command(name = "hostflow")]
#[command(about = "Deterministic routing and resilient execution in front of rp-cli")]
#[command(long_about = r#"
hostflow resolves a window, tab and workspace deterministically, runs the host
tool under a hard timeout, and recovers long builder jobs by retrying, falling
back to a selection-only export, or reusing an earlier export.

EXAMPLES:
  # Run a command against the only open window
  hostflow exec -e 'tree'

  # Plan export with every recovery step enabled
  hostflow plan-export --select-set src/,Cargo.toml --task "draft plan" \
    --out plan.md --retry-on-timeout --fallback-export-on-timeout \
    --resume-from-export previous-plan.md --report-json run.json

  # Fully explicit routing, no history
  hostflow smoke --strict --window 1 --tab T1 --workspace GitHub

CONFIGURATION:
  Precedence: CLI flags > config file > defaults.
  The config file is --config, else $HOSTFLOW_HOME/config.toml, else
  <config dir>/hostflow/config.toml.

EXIT CODES:
  0 success, 1 internal error or failed smoke check, 2 usage/config/routing
  error, 69 host tool unavailable, 70 host tool error, 124 timeout
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Timeout, profile and report flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Timeout in seconds for the main command (overrides the profile)
    #[arg(long, value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Execution profile: fast, normal or deep
    #[arg(long)]
    pub profile: Option<String>,

    /// Write a canonical JSON run report to this path
    #[arg(long)]
    pub report_json: Option<Utf8PathBuf>,
}

/// Target selection flags.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Window id
    #[arg(long)]
    pub window: Option<u32>,

    /// Tab name (default T1)
    #[arg(long)]
    pub tab: Option<String>,

    /// Workspace to switch to before running
    #[arg(long)]
    pub workspace: Option<String>,

    /// Require --window, --tab and --workspace; ignore routing history
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Comma-separated paths to select
    #[arg(long)]
    pub select_set: String,

    /// Export destination
    #[arg(long)]
    pub out: Utf8PathBuf,
}

/// Recovery switches for builder chains.
#[derive(Args, Debug, Clone, Default)]
pub struct RecoveryArgs {
    /// Retry the builder once when it times out or is killed
    #[arg(long)]
    pub retry_on_timeout: bool,

    /// Timeout in seconds for the retry
    #[arg(long, value_parser = parse_seconds)]
    pub retry_timeout: Option<Duration>,

    /// Multiplier for the retry timeout when --retry-timeout is not given
    #[arg(long)]
    pub retry_timeout_scale: Option<f64>,

    /// Fall back to a selection-only export after a builder timeout
    #[arg(long)]
    pub fallback_export_on_timeout: bool,

    /// Reuse this earlier export when every other step failed
    #[arg(long)]
    pub resume_from_export: Option<Utf8PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an exec command in the resolved window and tab
    Exec {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,

        /// Command text passed to the host tool
        #[arg(short = 'e', long)]
        command: String,

        /// Ask the host tool for raw JSON output
        #[arg(long)]
        raw_json: bool,
    },

    /// Call a host tool function
    Call {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,

        #[arg(long)]
        tool: String,

        /// JSON argument for the tool
        #[arg(long)]
        json_arg: Option<String>,
    },

    /// Select files and export the prompt
    Export {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Run a plan builder, then export, with optional recovery
    PlanExport {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        /// Task description for the builder
        #[arg(long)]
        task: String,

        #[command(flatten)]
        recovery: RecoveryArgs,
    },

    /// Health checks, then plan-export
    Autopilot {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        #[arg(long)]
        task: String,

        #[command(flatten)]
        recovery: RecoveryArgs,

        /// Timeout in seconds for each health check
        #[arg(long, value_parser = parse_seconds)]
        preflight_timeout: Option<Duration>,
    },

    /// Check routing, workspace and the host tool's health
    Smoke {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the host tool's tool schema
    ToolsSchema {
        #[command(flatten)]
        run: RunArgs,

        /// Restrict to one tool group
        #[arg(long)]
        group: Option<String>,
    },
}

impl Commands {
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Commands::Exec { .. } => CommandKind::Exec,
            Commands::Call { .. } => CommandKind::Call,
            Commands::Export { .. } => CommandKind::Export,
            Commands::PlanExport { .. } => CommandKind::PlanExport,
            Commands::Autopilot { .. } => CommandKind::Autopilot,
            Commands::Smoke { .. } => CommandKind::Smoke,
            Commands::ToolsSchema { .. } => CommandKind::ToolsSchema,
        }
    }

    #[must_use]
    pub fn run_args(&self) -> &RunArgs {
        match self {
            Commands::Exec { run, .. }
            | Commands::Call { run, .. }
            | Commands::Export { run, .. }
            | Commands::PlanExport { run, .. }
            | Commands::Autopilot { run, .. }
            | Commands::Smoke { run, .. }
            | Commands::ToolsSchema { run, .. } => run,
        }
    }

    #[must_use]
    pub fn target_args(&self) -> Option<&TargetArgs> {
        match self {
            Commands::Exec { target, .. }
            | Commands::Call { target, .. }
            | Commands::Export { target, .. }
            | Commands::PlanExport { target, .. }
            | Commands::Autopilot { target, .. }
            | Commands::Smoke { target, .. } => Some(target),
            Commands::ToolsSchema { .. } => None,
        }
    }

    #[must_use]
    pub fn recovery_args(&self) -> Option<&RecoveryArgs> {
        match self {
            Commands::PlanExport { recovery, .. } | Commands::Autopilot { recovery, .. } => {
                Some(recovery)
            }
            _ => None,
        }
    }
}

/// Seconds as an integer or decimal. Zero is accepted here and rejected by
/// timeout resolution so it surfaces as a configuration error.
pub(crate) fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("'{value}' must be a non-negative number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

/// Command tree, for completions and docs.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
