//! Process execution for the host tool.
//!
//! Every host tool call goes through [`CommandSpec`] (argv-style, never a shell
//! string) and a [`ProcessRunner`]. The production runner, [`NativeRunner`],
//! enforces a hard wall-clock timeout: on expiry it asks the process group to
//! terminate, waits a bounded grace period, then force-kills it.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;
pub mod ring_buffer;
mod terminate;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
pub use ring_buffer::RingBuffer;
