//! CLI entrypoint for the `stevedore` instance manager.
//!
//! The binary delegates to [`stevedore_cli::run`], which loads configuration,
//! parses the subcommand, and drives the managed instance through its
//! lifecycle.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    stevedore_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
