//! Synchronous execution of external runtime commands.
//!
//! [`SystemExecutor`] implements the [`CommandExecutor`] trait by running a
//! command to completion, capturing both output streams, and folding the exit
//! status into a [`CommandOutcome`]. Failures never propagate as errors from
//! this layer: they are logged together with the captured standard error and
//! handed back as [`CommandOutcome::Failure`] so the caller can decide whether
//! retrying is worthwhile. Nothing here retries.

use std::fmt;
use std::process::{Command, Stdio};

use tracing::{debug, error};

use crate::error::CommandError;

/// Tracing target for command execution.
const COMMAND_TARGET: &str = "stevedore_lifecycle::command";

/// A validated, non-empty argument vector: the program followed by its
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Builds a command line from an argument vector.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::EmptyArguments`] when the vector is empty and
    /// [`CommandError::EmptyProgram`] when the program name is blank.
    pub fn new<I, S>(argv: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = argv.into_iter().map(Into::into);
        let program = parts.next().ok_or(CommandError::EmptyArguments)?;
        if program.trim().is_empty() {
            return Err(CommandError::EmptyProgram);
        }
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Program to run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the full argument vector including the program.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.argv().join(" "))
    }
}

/// Details captured when a command fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// The command that failed, rendered for diagnostics.
    pub command: String,
    /// Exit status, or `None` when the process never ran or was killed by a
    /// signal.
    pub status: Option<i32>,
    /// Trimmed standard error, or the launch error message.
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(
                formatter,
                "'{}' exited with status {code}: {}",
                self.command, self.stderr
            ),
            None => write!(formatter, "'{}' did not complete: {}", self.command, self.stderr),
        }
    }
}

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command exited with status zero.
    Success {
        /// Trimmed standard output.
        stdout: String,
    },
    /// The command could not be launched or exited unsuccessfully.
    Failure(CommandFailure),
}

impl CommandOutcome {
    /// Convenience constructor for a successful outcome.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::Success {
            stdout: stdout.into(),
        }
    }

    /// Returns `true` when the command exited with status zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Collapses the outcome into trimmed standard output, using the empty
    /// string for any failure.
    ///
    /// This conflates "failed" with "succeeded without output"; prefer
    /// matching on the outcome where the difference matters.
    #[must_use]
    pub fn stdout_or_empty(&self) -> &str {
        match self {
            Self::Success { stdout } => stdout,
            Self::Failure(_) => "",
        }
    }
}

/// Trait abstracting command execution for testability.
///
/// The production implementation is [`SystemExecutor`]. Test code implements
/// this trait to simulate a container runtime without spawning processes.
pub trait CommandExecutor {
    /// Runs the command to completion and reports its outcome.
    fn execute(&self, command: &CommandLine) -> CommandOutcome;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(&self, command: &CommandLine) -> CommandOutcome {
        (**self).execute(command)
    }
}

/// Executes commands with [`std::process::Command`], blocking the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&self, command: &CommandLine) -> CommandOutcome {
        debug!(target: COMMAND_TARGET, %command, "running command");

        let output = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .output();

        let outcome = match output {
            Ok(output) if output.status.success() => {
                CommandOutcome::success(String::from_utf8_lossy(&output.stdout).trim())
            }
            Ok(output) => CommandOutcome::Failure(CommandFailure {
                command: command.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            }),
            Err(err) => CommandOutcome::Failure(CommandFailure {
                command: command.to_string(),
                status: None,
                stderr: err.to_string(),
            }),
        };

        if let CommandOutcome::Failure(failure) = &outcome {
            error!(
                target: COMMAND_TARGET,
                command = %failure.command,
                status = ?failure.status,
                stderr = %failure.stderr,
                "command failed"
            );
        }
        outcome
    }
}
