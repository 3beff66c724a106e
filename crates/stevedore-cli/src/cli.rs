//! CLI argument definitions for the `stevedore` binary.
//!
//! Configuration flags are stripped before these definitions see the
//! arguments, so only the subcommand and its operands are declared here.

use clap::{Parser, Subcommand};

/// Command-line interface for the `stevedore` instance manager.
#[derive(Parser, Debug)]
#[command(name = "stevedore", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The lifecycle operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Lifecycle operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts the instance unless it is already running.
    Start,
    /// Stops the instance if it is running.
    Stop,
    /// Prints whether the instance is running.
    Status,
    /// Runs a program inside the configured lifecycle scope.
    Run {
        /// Program followed by its arguments.
        #[arg(
            value_name = "PROGRAM",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,
    },
}
