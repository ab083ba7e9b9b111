//! hostflow: deterministic routing and resilient execution in front of a
//! stateful automation CLI.
//!
//! The binary is a thin clap layer over [`Engine`]; the engine and its
//! building blocks live in the `hostflow-*` workspace crates and are
//! re-exported here for embedding.
//!
//! ```no_run
//! use hostflow::{Config, Engine, FlowCommand, FlowRequest, RoutingRequest};
//! use hostflow_config::CliArgs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let engine = Engine::native(&config)?;
//! let outcome = engine.run(&FlowRequest {
//!     command: FlowCommand::Exec { command: "tree".into(), raw_json: false },
//!     routing: RoutingRequest::default(),
//!     profile: config.profile,
//!     timeout: None,
//! })?;
//! println!("exit code {}", outcome.exit_code.as_i32());
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use hostflow_config::Config;
pub use hostflow_engine::{Engine, FlowCommand, FlowOutcome, FlowRequest, RoutingRequest};
pub use hostflow_utils::{ExitCode, HostflowError};
