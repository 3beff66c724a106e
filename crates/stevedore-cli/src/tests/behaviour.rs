//! Behaviour-driven tests for the CLI subcommands.

use std::process::ExitCode;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use stevedore_config::Config;
use stevedore_lifecycle::testing::FakeRuntime;

use super::{Invocation, invoke};

struct TestWorld {
    config: Config,
    runtime: FakeRuntime,
    last: Option<Invocation>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            config: Config::default(),
            runtime: FakeRuntime::stopped(),
            last: None,
        }
    }
}

impl TestWorld {
    fn last(&self) -> &Invocation {
        self.last.as_ref().expect("no command has run")
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

#[given("a container runtime with nothing running")]
fn given_stopped_runtime(world: &mut TestWorld) {
    world.runtime = FakeRuntime::stopped().with_start_delay(1).with_stop_delay(1);
}

#[given("a container runtime that refuses to launch")]
fn given_refusing_runtime(world: &mut TestWorld) {
    world.runtime = FakeRuntime::stopped().refusing_launch();
}

#[when("the operator runs {command}")]
fn when_operator_runs(world: &mut TestWorld, command: String) {
    let args: Vec<&str> = command.trim_matches('"').split_whitespace().collect();
    world.last = Some(invoke(&world.config, &world.runtime, &args));
}

#[then("the command succeeds")]
fn then_succeeds(world: &mut TestWorld) {
    assert_eq!(world.last().exit, ExitCode::SUCCESS, "stderr: {}", world.last().stderr);
}

#[then("the command fails")]
fn then_fails(world: &mut TestWorld) {
    assert_eq!(world.last().exit, ExitCode::FAILURE);
}

#[then("stdout contains {text}")]
fn then_stdout_contains(world: &mut TestWorld, text: String) {
    let expected = text.trim_matches('"');
    assert!(
        world.last().stdout.contains(expected),
        "stdout was: {}",
        world.last().stdout
    );
}

#[then("stderr contains {text}")]
fn then_stderr_contains(world: &mut TestWorld, text: String) {
    let expected = text.trim_matches('"');
    assert!(
        world.last().stderr.contains(expected),
        "stderr was: {}",
        world.last().stderr
    );
}

#[then("the runtime saw {launches} launch(es) and {stops} stop(s)")]
fn then_runtime_counts(world: &mut TestWorld, launches: usize, stops: usize) {
    assert_eq!(world.runtime.launches(), launches);
    assert_eq!(world.runtime.stops(), stops);
}

#[scenario(
    path = "tests/features/stevedore_cli.feature",
    name = "Starting and stopping from the terminal"
)]
fn start_stop_from_terminal(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stevedore_cli.feature",
    name = "Starting twice reuses the instance"
)]
fn start_twice_reuses_instance(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stevedore_cli.feature",
    name = "A refused launch is reported"
)]
fn refused_launch_is_reported(world: TestWorld) {
    let _ = world;
}
