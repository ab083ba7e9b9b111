use std::ffi::OsString;
use std::process::Command;

// ============================================================================
// CommandSpec - argv-style host tool invocation
// ============================================================================

/// Specification for a host tool process.
///
/// Arguments are stored as discrete `OsString` elements and handed to
/// `Command::args`, so text such as `workspace switch "GitHub"` reaches the host
/// tool verbatim as a single argument. No shell is involved.
///
/// # Example
///
/// ```rust
/// use hostflow_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("rp-cli")
///     .args(["-w", "3", "-t", "T1"])
///     .arg("-e")
///     .arg("tabs");
///
/// assert_eq!(cmd.program, OsString::from("rp-cli"));
/// assert_eq!(cmd.args.len(), 6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
}

impl CommandSpec {
    /// Create a new `CommandSpec` for the given program.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name for diagnostics (lossy).
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Human-readable rendering used in logs and reports.
    ///
    /// Arguments containing whitespace are wrapped in single quotes. The result is
    /// for display only and is never executed.
    #[must_use]
    pub fn display(&self) -> String {
        let mut parts = vec![self.program_name()];
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.chars().any(char::is_whitespace) {
                parts.push(format!("'{arg}'"));
            } else {
                parts.push(arg.into_owned());
            }
        }
        parts.join(" ")
    }

    /// Convert into a `std::process::Command` using argv-style APIs only.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}
