//! Command-line runtime for the `stevedore` instance manager.
//!
//! The runtime owns argument splitting, configuration bootstrapping, and
//! dispatch of the `start`, `stop`, `status`, and `run` subcommands onto the
//! lifecycle crate. It can be driven from the binary entrypoint or from tests
//! where configuration loading, the container runtime, and IO streams are
//! substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::{Command, ExitCode, ExitStatus};

use clap::Parser;
use ortho_config::is_display_request;
use stevedore_config::Config;
use stevedore_lifecycle::{InstanceController, Lifecycle, ScopeBinding, SessionGuard, telemetry};

mod cli;
mod config;
mod errors;

use cli::{Cli, CliCommand};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run_with_lifecycle<I, C, F>(&mut self, args: I, build: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        C: Lifecycle,
        F: FnOnce(&Config) -> C,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let result = Cli::try_parse_from(cli_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|config| (cli, config))
            })
            .and_then(|(cli, config)| {
                telemetry::initialise(&config)?;
                let lifecycle = build(&config);
                self.dispatch(cli.command, &config, lifecycle)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(request)) if is_display_request(&request) => {
                let _ = write!(self.io.stdout, "{request}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn dispatch<C: Lifecycle>(
        &mut self,
        command: CliCommand,
        config: &Config,
        mut lifecycle: C,
    ) -> Result<ExitCode, AppError> {
        match command {
            CliCommand::Start => {
                let handle = lifecycle.start()?;
                self.print(format_args!("{handle}"))?;
                Ok(ExitCode::SUCCESS)
            }
            CliCommand::Stop => {
                let handle = lifecycle.stop()?;
                self.print(format_args!("{handle}"))?;
                Ok(ExitCode::SUCCESS)
            }
            CliCommand::Status => {
                let handle = lifecycle.status()?;
                if handle.is_running() {
                    self.print(format_args!("running ({handle})"))?;
                } else {
                    self.print(format_args!("stopped"))?;
                }
                Ok(ExitCode::SUCCESS)
            }
            CliCommand::Run { command } => {
                let mut binding = ScopeBinding::new(
                    lifecycle,
                    config.manage_instance(),
                    config.instance_scope(),
                );
                run_in_scope(&mut binding, &command)
            }
        }
    }

    fn print(&mut self, message: std::fmt::Arguments<'_>) -> Result<(), AppError> {
        writeln!(self.io.stdout, "{message}").map_err(AppError::WriteOutput)?;
        self.io.stdout.flush().map_err(AppError::WriteOutput)
    }
}

/// Runs `command` as a single unit inside a session of `binding`.
fn run_in_scope<C: Lifecycle>(
    binding: &mut ScopeBinding<C>,
    command: &[String],
) -> Result<ExitCode, AppError> {
    let Some((program, arguments)) = command.split_first() else {
        return Ok(ExitCode::FAILURE);
    };

    let mut session = SessionGuard::begin(binding)?;
    let status = session.run_unit(program, || {
        Command::new(program).args(arguments).status()
    })?;
    session.finish()?;

    let status = status.map_err(|source| AppError::Spawn {
        program: program.clone(),
        source,
    })?;
    Ok(exit_code_from_status(status))
}

fn exit_code_from_status(status: ExitStatus) -> ExitCode {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(
        args,
        IoStreams::new(stdout, stderr),
        &OrthoConfigLoader,
        InstanceController::from_config,
    )
}

/// Runs the CLI with a custom configuration loader and lifecycle builder.
pub(crate) fn run_with_loader<I, W, E, L, C, F>(
    args: I,
    io: IoStreams<'_, W, E>,
    loader: &L,
    build: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    C: Lifecycle,
    F: FnOnce(&Config) -> C,
{
    CliRunner::new(io, loader).run_with_lifecycle(args, build)
}

#[cfg(test)]
mod tests;
