//! Platform-specific termination of a timed-out host tool.
//!
//! On Unix the host tool is spawned as the leader of its own process group, so
//! signals reach any helpers it started as well.

use std::process::{Child, ExitStatus};

/// Ask the process (group) to exit. Returns false when the platform has no
/// graceful path and the caller should force-kill immediately.
#[cfg(unix)]
pub(crate) fn request_termination(child: &Child) -> bool {
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    if killpg(pid, Signal::SIGTERM).is_err() {
        let _ = kill(pid, Signal::SIGTERM);
    }
    true
}

#[cfg(not(unix))]
pub(crate) fn request_termination(_child: &Child) -> bool {
    false
}

#[cfg(unix)]
pub(crate) fn force_kill(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
    let _ = child.kill();
}

#[cfg(not(unix))]
pub(crate) fn force_kill(child: &mut Child) {
    let _ = child.kill();
}

/// Kill whatever is still running in a reaped child's process group.
#[cfg(unix)]
pub(crate) fn kill_leftovers(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
pub(crate) fn kill_leftovers(_child: &Child) {}

#[cfg(unix)]
pub(crate) fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
pub(crate) fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
