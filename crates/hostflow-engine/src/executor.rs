use hostflow_config::Config;
use hostflow_runner::{CommandSpec, NativeRunner, ProcessRunner};
use hostflow_utils::error::HostflowError;
use hostflow_utils::types::{CommandKind, ExecutionOutcome};
use std::time::Duration;

use crate::classify::{Classifier, HostOperation};

/// One host tool call, built per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub kind: CommandKind,
    pub operation: HostOperation,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Timeouts of builder-related invocations classify as `builder_timeout`.
    pub builder_related: bool,
}

impl CommandInvocation {
    #[must_use]
    pub fn new(
        kind: CommandKind,
        operation: HostOperation,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            kind,
            operation,
            args,
            timeout,
            builder_related: false,
        }
    }

    #[must_use]
    pub fn builder_related(mut self, builder_related: bool) -> Self {
        self.builder_related = builder_related;
        self
    }

    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }
}

/// Classified outcome plus the captured output, for parsing and echoing.
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: ExecutionOutcome,
    pub stdout: String,
    pub stderr: String,
}

/// Runs host tool invocations through a [`ProcessRunner`] and classifies the result.
#[derive(Debug)]
pub struct Executor<R: ProcessRunner> {
    runner: R,
    binary: String,
    classifier: Classifier,
}

impl Executor<NativeRunner> {
    /// Production executor. Fails with `ToolUnavailable` when the host binary
    /// cannot be found.
    pub fn native(config: &Config) -> Result<Self, HostflowError> {
        let resolved = which::which(&config.host_binary).map_err(|_| {
            HostflowError::ToolUnavailable {
                program: config.host_binary.clone(),
            }
        })?;
        tracing::debug!(binary = %resolved.display(), "resolved host tool");

        let runner = NativeRunner::new().with_grace_period(config.grace_period);
        Ok(Self::new(
            runner,
            resolved.to_string_lossy().into_owned(),
            Classifier::new(config.tail_bytes),
        ))
    }
}

impl<R: ProcessRunner> Executor<R> {
    #[must_use]
    pub fn new(runner: R, binary: impl Into<String>, classifier: Classifier) -> Self {
        Self {
            runner,
            binary: binary.into(),
            classifier,
        }
    }

    /// Run one invocation to completion or timeout.
    ///
    /// `Err` only when no process could be observed (missing binary, spawn
    /// failure); every exit, timeout and kill is an `Ok` outcome.
    pub fn run(&self, invocation: &CommandInvocation) -> Result<Execution, HostflowError> {
        let spec = CommandSpec::new(&self.binary).args(&invocation.args);
        tracing::debug!(
            kind = %invocation.kind,
            timeout_ms = invocation.timeout.as_millis() as u64,
            command = %spec.display(),
            "running host tool"
        );

        let output = self.runner.run(&spec, invocation.timeout)?;
        let outcome =
            self.classifier
                .classify(invocation.operation, invocation.builder_related, &output);

        Ok(Execution {
            outcome,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
