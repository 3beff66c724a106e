//! Unit and behaviour tests for the CLI runtime.

use std::ffi::OsString;
use std::process::ExitCode;

use rstest::rstest;

use stevedore_config::{Config, ScopeSelector};
use stevedore_lifecycle::testing::{FakeRuntime, RecordingSleeper};
use stevedore_lifecycle::{InstanceController, InstanceSpec, RetryPolicy};

use super::*;

mod behaviour;

struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Output captured from one in-process CLI invocation.
struct Invocation {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(config: &Config, runtime: &FakeRuntime, args: &[&str]) -> Invocation {
    let sleeper = RecordingSleeper::new();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(config.clone());
    let argv = std::iter::once("stevedore")
        .chain(args.iter().copied())
        .map(OsString::from);

    let exit = run_with_loader(
        argv,
        IoStreams::new(&mut stdout, &mut stderr),
        &loader,
        |config: &Config| {
            InstanceController::new(InstanceSpec::from_config(config), runtime)
                .with_policy(RetryPolicy::from_config(config))
                .with_sleeper(&sleeper)
        },
    );

    Invocation {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

fn managed(scope: ScopeSelector) -> Config {
    Config {
        manage_instance: true,
        instance_scope: scope,
        ..Config::default()
    }
}

#[test]
fn start_prints_handle_and_ignores_gate() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&Config::default(), &runtime, &["start"]);

    assert_eq!(result.exit, ExitCode::SUCCESS);
    assert_eq!(result.stdout.trim(), "000000000001");
    assert_eq!(runtime.launches(), 1);
}

#[test]
fn stop_when_stopped_prints_none() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&Config::default(), &runtime, &["stop"]);

    assert_eq!(result.exit, ExitCode::SUCCESS);
    assert_eq!(result.stdout.trim(), "<none>");
    assert_eq!(runtime.stops(), 0);
}

#[test]
fn status_reports_running_handle() {
    let runtime = FakeRuntime::running("abc");

    let result = invoke(&Config::default(), &runtime, &["status"]);

    assert_eq!(result.stdout.trim(), "running (abc)");
}

#[test]
fn status_reports_stopped() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&Config::default(), &runtime, &["status"]);

    assert_eq!(result.stdout.trim(), "stopped");
}

#[test]
fn lifecycle_failure_exits_with_failure() {
    let runtime = FakeRuntime::stopped().refusing_launch();

    let result = invoke(&Config::default(), &runtime, &["start"]);

    assert_eq!(result.exit, ExitCode::FAILURE);
    assert!(
        result.stderr.contains("failed to launch"),
        "stderr: {}",
        result.stderr
    );
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&Config::default(), &runtime, &[]);

    assert_eq!(result.exit, ExitCode::FAILURE);
    assert!(result.stderr.contains("Usage"), "stderr: {}", result.stderr);
    assert!(runtime.commands().is_empty());
}

#[rstest]
#[case::help("--help", "Usage")]
#[case::version("--version", env!("CARGO_PKG_VERSION"))]
fn display_requests_go_to_stdout_and_succeed(#[case] flag: &str, #[case] expected: &str) {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&Config::default(), &runtime, &[flag]);

    assert_eq!(result.exit, ExitCode::SUCCESS);
    assert!(result.stdout.contains(expected), "stdout: {}", result.stdout);
    assert!(result.stderr.is_empty(), "stderr: {}", result.stderr);
    assert!(runtime.commands().is_empty());
}

#[cfg(unix)]
#[test]
fn run_without_management_leaves_runtime_alone() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&Config::default(), &runtime, &["run", "--", "true"]);

    assert_eq!(result.exit, ExitCode::SUCCESS);
    assert!(runtime.commands().is_empty());
}

#[cfg(unix)]
#[test]
fn run_brackets_program_and_forwards_exit_code() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(
        &managed(ScopeSelector::Session),
        &runtime,
        &["run", "--", "sh", "-c", "exit 3"],
    );

    assert_eq!(result.exit, ExitCode::from(3));
    assert_eq!((runtime.launches(), runtime.stops()), (1, 1));
    assert!(!runtime.is_running());
}

#[cfg(unix)]
#[test]
fn run_in_unit_scope_also_brackets_program() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(&managed(ScopeSelector::Unit), &runtime, &["run", "true"]);

    assert_eq!(result.exit, ExitCode::SUCCESS);
    assert_eq!((runtime.launches(), runtime.stops()), (1, 1));
}

#[test]
fn run_skips_program_when_start_fails() {
    let runtime = FakeRuntime::stopped().refusing_launch();

    let result = invoke(
        &managed(ScopeSelector::Session),
        &runtime,
        &["run", "--", "stevedore-program-that-must-not-run"],
    );

    assert_eq!(result.exit, ExitCode::FAILURE);
    assert!(
        !result.stderr.contains("failed to run"),
        "program should not be spawned: {}",
        result.stderr
    );
}

#[test]
fn missing_program_is_reported_after_teardown() {
    let runtime = FakeRuntime::stopped();

    let result = invoke(
        &managed(ScopeSelector::Session),
        &runtime,
        &["run", "--", "stevedore-program-that-does-not-exist"],
    );

    assert_eq!(result.exit, ExitCode::FAILURE);
    assert!(result.stderr.contains("failed to run"), "stderr: {}", result.stderr);
    assert_eq!(runtime.stops(), 1);
}

#[test]
fn leading_config_flags_are_hidden_from_clap() {
    let args: Vec<OsString> = ["stevedore", "--log-filter", "debug", "status"]
        .into_iter()
        .map(OsString::from)
        .collect();

    let cli_arguments = prepare_cli_arguments(&args, &split_config_arguments(&args));

    assert_eq!(cli_arguments, [OsString::from("stevedore"), OsString::from("status")]);
}
