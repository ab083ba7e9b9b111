//! Configuration for hostflow.
//!
//! Values come from, in decreasing precedence: CLI flags, the TOML config file,
//! and built-in defaults. [`profile`] holds the fixed timeout table.

mod discovery;
mod model;
pub mod profile;
mod validation;

pub use model::{
    CliArgs, Config, ConfigFile, ConfigSource, DEFAULT_GRACE_PERIOD_MS, DEFAULT_HOST_BINARY,
    DEFAULT_RETRY_TIMEOUT_SCALE, DEFAULT_TAIL_BYTES, DefaultsSection, HostSection,
    MAX_GRACE_PERIOD_MS, MAX_RETRY_TIMEOUT_SCALE, MIN_TAIL_BYTES, RoutingSection,
};
pub use profile::{ExecutionProfile, MAX_TIMEOUT, ProfileName, check_timeout, resolve};
