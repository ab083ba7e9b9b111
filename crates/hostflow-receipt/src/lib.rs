//! Run reports: built incrementally while a command runs, emitted once at the
//! end as canonical JSON (RFC 8785) so byte-identical runs produce
//! byte-identical reports.

mod builder;
mod emit;
mod writer;

pub use builder::{REPORT_VERSION, ReportBuilder};
pub use emit::emit_report_jcs;
pub use writer::emit;
