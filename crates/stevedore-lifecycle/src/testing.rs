//! Test doubles for the command and sleep seams.
//!
//! [`FakeRuntime`] interprets `ps`, `run`, and `stop` command lines the way a
//! container runtime would, with configurable delays between a command and
//! its effect becoming observable. [`RecordingSleeper`] captures requested
//! waits instead of blocking.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use crate::backoff::Sleeper;
use crate::command::{CommandExecutor, CommandFailure, CommandLine, CommandOutcome};

/// Records every requested sleep without blocking.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the waits requested so far, in order.
    #[must_use]
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }

    /// Forgets previously recorded waits.
    pub fn clear(&self) {
        self.waits.borrow_mut().clear();
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Stopped,
    Starting { handle: String, polls_left: u32 },
    Running { handle: String },
    Stopping { handle: String, polls_left: u32 },
}

/// Simulated container runtime driven by command lines.
///
/// A delay of `n` polls means the `n`-th query after the command is the first
/// one to observe the new state; a delay of zero makes the change visible
/// immediately. A delay larger than the retry ceiling never completes.
#[derive(Debug)]
pub struct FakeRuntime {
    phase: RefCell<Phase>,
    start_delay: u32,
    stop_delay: u32,
    failing_queries: Cell<u32>,
    refuse_launch: bool,
    refuse_stop: bool,
    next_id: Cell<u32>,
    commands: RefCell<Vec<Vec<String>>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::stopped()
    }
}

impl FakeRuntime {
    /// A runtime with nothing running.
    #[must_use]
    pub fn stopped() -> Self {
        Self {
            phase: RefCell::new(Phase::Stopped),
            start_delay: 0,
            stop_delay: 0,
            failing_queries: Cell::new(0),
            refuse_launch: false,
            refuse_stop: false,
            next_id: Cell::new(1),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// A runtime already running an instance with the given handle.
    #[must_use]
    pub fn running(handle: impl Into<String>) -> Self {
        let runtime = Self::stopped();
        runtime.phase.replace(Phase::Running {
            handle: handle.into(),
        });
        runtime
    }

    /// Number of polls after a launch before the instance is observable.
    #[must_use]
    pub const fn with_start_delay(mut self, polls: u32) -> Self {
        self.start_delay = polls;
        self
    }

    /// Number of polls after a stop before the instance disappears.
    #[must_use]
    pub const fn with_stop_delay(mut self, polls: u32) -> Self {
        self.stop_delay = polls;
        self
    }

    /// Makes the next `count` queries fail as if the runtime were unreachable.
    #[must_use]
    pub fn with_failing_queries(self, count: u32) -> Self {
        self.failing_queries.set(count);
        self
    }

    /// Makes every launch command fail.
    #[must_use]
    pub const fn refusing_launch(mut self) -> Self {
        self.refuse_launch = true;
        self
    }

    /// Makes every stop command fail.
    #[must_use]
    pub const fn refusing_stop(mut self) -> Self {
        self.refuse_stop = true;
        self
    }

    /// Every command line executed so far, program included.
    #[must_use]
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.borrow().clone()
    }

    /// Number of `ps` queries executed.
    #[must_use]
    pub fn queries(&self) -> usize {
        self.count_subcommand("ps")
    }

    /// Number of `run` commands executed.
    #[must_use]
    pub fn launches(&self) -> usize {
        self.count_subcommand("run")
    }

    /// Number of `stop` commands executed.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.count_subcommand("stop")
    }

    /// Whether the runtime currently reports a running instance.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(
            *self.phase.borrow(),
            Phase::Running { .. } | Phase::Stopping { .. }
        )
    }

    fn count_subcommand(&self, name: &str) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|argv| argv.get(1).is_some_and(|sub| sub == name))
            .count()
    }

    fn failure(command: &CommandLine, stderr: &str) -> CommandOutcome {
        CommandOutcome::Failure(CommandFailure {
            command: command.to_string(),
            status: Some(1),
            stderr: stderr.to_owned(),
        })
    }

    fn query(&self, command: &CommandLine) -> CommandOutcome {
        if self.failing_queries.get() > 0 {
            self.failing_queries.set(self.failing_queries.get() - 1);
            return Self::failure(command, "Cannot connect to the runtime daemon");
        }

        let mut phase = self.phase.borrow_mut();
        let next = match &*phase {
            Phase::Starting { handle, polls_left } if *polls_left <= 1 => Phase::Running {
                handle: handle.clone(),
            },
            Phase::Starting { handle, polls_left } => Phase::Starting {
                handle: handle.clone(),
                polls_left: polls_left - 1,
            },
            Phase::Stopping { polls_left, .. } if *polls_left <= 1 => Phase::Stopped,
            Phase::Stopping { handle, polls_left } => Phase::Stopping {
                handle: handle.clone(),
                polls_left: polls_left - 1,
            },
            other => other.clone(),
        };
        *phase = next;

        match &*phase {
            Phase::Running { handle } | Phase::Stopping { handle, .. } => {
                CommandOutcome::success(handle.clone())
            }
            Phase::Stopped | Phase::Starting { .. } => CommandOutcome::success(""),
        }
    }

    fn launch(&self, command: &CommandLine) -> CommandOutcome {
        if self.refuse_launch {
            return Self::failure(command, "Unable to find image locally");
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = format!("{id:012x}");
        let phase = if self.start_delay == 0 {
            Phase::Running {
                handle: handle.clone(),
            }
        } else {
            Phase::Starting {
                handle: handle.clone(),
                polls_left: self.start_delay,
            }
        };
        self.phase.replace(phase);
        CommandOutcome::success(handle)
    }

    fn stop(&self, command: &CommandLine) -> CommandOutcome {
        if self.refuse_stop {
            return Self::failure(command, "permission denied");
        }
        let current = self.phase.borrow().clone();
        let Phase::Running { handle } = current else {
            return Self::failure(command, "No such container");
        };
        let phase = if self.stop_delay == 0 {
            Phase::Stopped
        } else {
            Phase::Stopping {
                handle: handle.clone(),
                polls_left: self.stop_delay,
            }
        };
        self.phase.replace(phase);
        CommandOutcome::success(handle)
    }
}

impl CommandExecutor for FakeRuntime {
    fn execute(&self, command: &CommandLine) -> CommandOutcome {
        self.commands.borrow_mut().push(
            command
                .argv()
                .into_iter()
                .map(str::to_owned)
                .collect(),
        );
        match command.args().first().map(String::as_str) {
            Some("ps") => self.query(command),
            Some("run") => self.launch(command),
            Some("stop") => self.stop(command),
            _ => Self::failure(command, "unknown command"),
        }
    }
}
