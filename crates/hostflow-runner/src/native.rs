use crate::error::RunnerError;
use crate::ring_buffer::RingBuffer;
use crate::terminate;
use std::io::{ErrorKind, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// Default wait between SIGTERM and SIGKILL.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Default stdout capture limit (2 MiB). Large enough for window/tab listings.
pub const DEFAULT_STDOUT_CAP_BYTES: usize = 2 * 1024 * 1024;

/// Default stderr capture limit (256 KiB).
pub const DEFAULT_STDERR_CAP_BYTES: usize = 256 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long the output readers may lag behind the reaped process.
const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_secs(1);

// ============================================================================
// NativeRunner - direct process execution with a hard timeout
// ============================================================================

/// Native process runner using `std::process::Command`.
///
/// The process is polled until it exits or the timeout expires. On expiry the
/// runner sends SIGTERM to the process group, polls for at most
/// `grace_period`, then sends SIGKILL. Once the process is reaped, anything it
/// left running in its group is killed so that no helper can keep the output
/// pipes (and the call) open. A timeout too large to represent as a deadline
/// means no deadline.
///
/// # Example
///
/// ```rust,no_run
/// use hostflow_runner::{CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new().with_grace_period(Duration::from_millis(500));
/// let cmd = CommandSpec::new("rp-cli").args(["--raw-json", "-e", "windows"]);
///
/// let output = runner.run(&cmd, Duration::from_secs(30)).unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NativeRunner {
    grace_period: Duration,
    stdout_cap_bytes: usize,
    stderr_cap_bytes: usize,
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            stdout_cap_bytes: DEFAULT_STDOUT_CAP_BYTES,
            stderr_cap_bytes: DEFAULT_STDERR_CAP_BYTES,
        }
    }
}

impl NativeRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub const fn with_capture_limits(mut self, stdout_bytes: usize, stderr_bytes: usize) -> Self {
        self.stdout_cap_bytes = stdout_bytes;
        self.stderr_cap_bytes = stderr_bytes;
        self
    }

    /// Terminate a timed-out child. Returns its status and whether SIGKILL was needed.
    fn stop(&self, child: &mut Child, program: &str) -> Result<(ExitStatus, bool), RunnerError> {
        if terminate::request_termination(child)
            && let Some(grace_deadline) = Instant::now().checked_add(self.grace_period)
        {
            loop {
                if let Some(status) = try_wait(child, program)? {
                    return Ok((status, false));
                }
                let now = Instant::now();
                if now >= grace_deadline {
                    break;
                }
                thread::sleep(POLL_INTERVAL.min(grace_deadline - now));
            }
        }

        tracing::debug!(program = %program, "grace period elapsed; force-killing host tool");
        terminate::force_kill(child);
        let status = child.wait().map_err(|e| RunnerError::WaitFailed {
            program: program.to_string(),
            reason: e.to_string(),
        })?;
        Ok((status, true))
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program_name();

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => RunnerError::ProgramNotFound {
                program: program.clone(),
            },
            _ => RunnerError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            },
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::PipeUnavailable {
                program: program.clone(),
                stream: "stdout",
            })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::PipeUnavailable {
                program: program.clone(),
                stream: "stderr",
            })?;

        let stdout_reader = capture(stdout, self.stdout_cap_bytes);
        let stderr_reader = capture(stderr, self.stderr_cap_bytes);

        let deadline = started.checked_add(timeout);
        let mut timed_out = false;
        let mut force_killed = false;

        let status = loop {
            if let Some(status) = try_wait(&mut child, &program)? {
                break status;
            }
            let now = Instant::now();
            match deadline {
                Some(deadline) if now >= deadline => {
                    timed_out = true;
                    tracing::debug!(
                        program = %program,
                        timeout_ms = timeout.as_millis() as u64,
                        "host tool exceeded timeout; requesting termination"
                    );
                    let (status, forced) = self.stop(&mut child, &program)?;
                    force_killed = forced;
                    break status;
                }
                Some(deadline) => thread::sleep(POLL_INTERVAL.min(deadline - now)),
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        terminate::kill_leftovers(&child);
        let drain_deadline = Instant::now() + OUTPUT_DRAIN_LIMIT;
        let stdout = collect(stdout_reader, drain_deadline, &program, "stdout");
        let stderr = collect(stderr_reader, drain_deadline, &program, "stderr");

        Ok(ProcessOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            stdout_bytes: stdout.total_bytes_written(),
            stderr_bytes: stderr.total_bytes_written(),
            exit_code: status.code(),
            signal: terminate::exit_signal(&status),
            timed_out,
            force_killed,
            duration: started.elapsed(),
        })
    }
}

fn try_wait(child: &mut Child, program: &str) -> Result<Option<ExitStatus>, RunnerError> {
    child.try_wait().map_err(|e| RunnerError::WaitFailed {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

/// Join a reader, giving up once `drain_deadline` passes. A pipe still open at
/// that point belongs to a process outside the group; its reader is detached.
fn collect(
    reader: JoinHandle<RingBuffer>,
    drain_deadline: Instant,
    program: &str,
    stream: &'static str,
) -> RingBuffer {
    while !reader.is_finished() {
        let now = Instant::now();
        if now >= drain_deadline {
            tracing::warn!(
                program = %program,
                stream,
                "output pipe still open after the host tool exited; dropping capture"
            );
            return RingBuffer::new(0);
        }
        thread::sleep(POLL_INTERVAL.min(drain_deadline - now));
    }
    reader.join().unwrap_or_else(|_| RingBuffer::new(0))
}

fn capture<R: Read + Send + 'static>(mut pipe: R, cap_bytes: usize) -> JoinHandle<RingBuffer> {
    thread::spawn(move || {
        let mut buffer = RingBuffer::new(cap_bytes);
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.write(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        buffer
    })
}
