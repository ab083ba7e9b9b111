//! Foundation types and helpers shared by every hostflow crate: the error
//! taxonomy and exit codes, the run data model, atomic file writes, logging
//! setup and well-known paths.

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;
pub mod types;

pub use error::{
    ConfigError, ErrorCategory, HostflowError, RoutingError, StateError, UserFriendlyError,
};
pub use exit_codes::ExitCode;
