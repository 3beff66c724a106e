//! Domain errors raised by lifecycle operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. Command failures keep the
//! captured standard error so operators see why the runtime refused.

use thiserror::Error;

use crate::backoff::Transient;
use crate::command::CommandFailure;
use crate::controller::InstanceHandle;

/// Errors raised while building a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The argument vector held no program.
    #[error("command argument vector must not be empty")]
    EmptyArguments,

    /// The program name was blank.
    #[error("command program name must not be blank")]
    EmptyProgram,
}

/// Errors arising from instance start, stop, and status operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A runtime command could not be built from the configuration.
    #[error("invalid runtime command: {0}")]
    Command(#[from] CommandError),

    /// The runtime could not be asked which instances are running.
    #[error("failed to query running instances of '{name}': {failure}")]
    Query {
        /// Managed instance name.
        name: String,
        /// Details of the failed query command.
        failure: CommandFailure,
    },

    /// Repeated query failures left the instance state unknown.
    #[error("state of '{name}' could not be determined after {attempts} attempts")]
    Unavailable {
        /// Managed instance name.
        name: String,
        /// Number of query attempts made.
        attempts: u32,
        /// Last query failure observed.
        #[source]
        source: Option<Box<ControllerError>>,
    },

    /// The runtime refused to launch the instance.
    #[error("failed to launch '{name}': {failure}")]
    Launch {
        /// Managed instance name.
        name: String,
        /// Details of the failed launch command.
        failure: CommandFailure,
    },

    /// The runtime refused to stop the instance.
    #[error("failed to stop '{name}' ({handle}): {failure}")]
    Stop {
        /// Managed instance name.
        name: String,
        /// Handle the stop command targeted.
        handle: InstanceHandle,
        /// Details of the failed stop command.
        failure: CommandFailure,
    },

    /// The instance never became observable after launch.
    #[error("'{name}' was not running after {attempts} polling attempts")]
    StartTimeout {
        /// Managed instance name.
        name: String,
        /// Number of polling attempts made.
        attempts: u32,
    },

    /// The instance was still observable after the stop command.
    #[error("'{name}' ({handle}) was still running after {attempts} polling attempts")]
    StopTimeout {
        /// Managed instance name.
        name: String,
        /// Handle that was running before the stop command.
        handle: InstanceHandle,
        /// Number of polling attempts made.
        attempts: u32,
    },
}

impl Transient for ControllerError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}
