//! Recovery for builder chains: a pure transition table and the controller
//! that drives it against the host tool.

mod controller;
mod machine;

pub use controller::{BuilderChain, ChainResult, RecoveryPolicy, ResilienceController};
pub use machine::{ChainFlags, ChainInput, ChainState, RecoveryOrder, transition};
