//! Command-line interface for hostflow.
//!
//! - `args`: clap definitions
//! - `run`: entry point and dispatch
//! - `commands`: request building and output

pub mod args;
mod commands;
mod run;


pub use args::{Cli, Commands, build_cli};
pub use run::run;
