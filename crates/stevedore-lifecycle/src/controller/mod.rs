//! Idempotent start/stop state machine for one managed instance.
//!
//! The controller never stores whether the instance is running. Each
//! operation asks the runtime, acts only when the observed state differs from
//! the requested one, then polls with backoff until the runtime reports the
//! new state or the retry ceiling is reached.
//!
//! ```text
//!            start(): launch, grace, poll until running
//!   Stopped ───────────────────────────────────────────▶ Running
//!           ◀───────────────────────────────────────────
//!            stop(): stop ids, grace, poll until empty
//! ```
//!
//! Calling `start` on a running instance or `stop` on a stopped one issues no
//! runtime command besides the query.

mod handle;
mod runtime;

use std::time::Duration;

use stevedore_config::Config;
use tracing::{debug, info, warn};

pub use self::handle::{InstanceHandle, InstanceSpec};
pub use self::runtime::RuntimeCommands;
use crate::backoff::{BackoffRetrier, RetryError, RetryPolicy, Sleeper, ThreadSleeper};
use crate::command::{CommandExecutor, CommandOutcome, SystemExecutor};
use crate::error::ControllerError;

/// Tracing target for instance transitions.
const CONTROLLER_TARGET: &str = "stevedore_lifecycle::controller";

/// Fixed pauses between issuing a command and polling for its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracePeriods {
    /// Pause after the launch command.
    pub start: Duration,
    /// Pause after the stop command.
    pub stop: Duration,
}

impl Default for GracePeriods {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(2_500),
            stop: Duration::from_millis(1_500),
        }
    }
}

impl GracePeriods {
    /// Reads the grace periods from the shared configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            start: config.start_grace(),
            stop: config.stop_grace(),
        }
    }
}

/// Start, stop, and status operations routed to by lifecycle hooks.
///
/// [`InstanceController`] is the production implementation. Hook tests
/// substitute a mock to observe routing without a runtime.
pub trait Lifecycle {
    /// Ensures the instance is running and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when the instance could not be started.
    fn start(&mut self) -> Result<InstanceHandle, ControllerError>;

    /// Ensures the instance is stopped and returns the handle that was
    /// running, or the empty handle when nothing was.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when the instance could not be stopped.
    fn stop(&mut self) -> Result<InstanceHandle, ControllerError>;

    /// Reports the currently running handle.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when the runtime could not be queried.
    fn status(&self) -> Result<InstanceHandle, ControllerError>;
}

/// Owns the start/stop state machine for one [`InstanceSpec`].
#[derive(Debug)]
pub struct InstanceController<X, S = ThreadSleeper> {
    spec: InstanceSpec,
    commands: RuntimeCommands,
    executor: X,
    retrier: BackoffRetrier<S>,
    grace: GracePeriods,
    last_started: Option<InstanceHandle>,
}

impl InstanceController<SystemExecutor> {
    /// Assembles the production controller described by the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(InstanceSpec::from_config(config), SystemExecutor)
            .with_runtime(RuntimeCommands::new(config.runtime_binary()))
            .with_policy(RetryPolicy::from_config(config))
            .with_grace(GracePeriods::from_config(config))
    }
}

impl<X: CommandExecutor> InstanceController<X> {
    /// Creates a controller using `docker`, the default retry policy, and the
    /// default grace periods.
    #[must_use]
    pub fn new(spec: InstanceSpec, executor: X) -> Self {
        Self {
            spec,
            commands: RuntimeCommands::default(),
            executor,
            retrier: BackoffRetrier::default(),
            grace: GracePeriods::default(),
            last_started: None,
        }
    }
}

impl<X, S> InstanceController<X, S> {
    /// Replaces the runtime command builder.
    #[must_use]
    pub fn with_runtime(mut self, commands: RuntimeCommands) -> Self {
        self.commands = commands;
        self
    }

    /// Replaces the retry policy, keeping the sleeper.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        let (_, sleeper) = self.retrier.into_parts();
        self.retrier = BackoffRetrier::with_sleeper(policy, sleeper);
        self
    }

    /// Replaces the grace periods.
    #[must_use]
    pub fn with_grace(mut self, grace: GracePeriods) -> Self {
        self.grace = grace;
        self
    }

    /// Replaces the sleeper used for grace periods and backoff waits.
    #[must_use]
    pub fn with_sleeper<T>(self, sleeper: T) -> InstanceController<X, T> {
        let (policy, _) = self.retrier.into_parts();
        InstanceController {
            spec: self.spec,
            commands: self.commands,
            executor: self.executor,
            retrier: BackoffRetrier::with_sleeper(policy, sleeper),
            grace: self.grace,
            last_started: self.last_started,
        }
    }

    /// The managed instance.
    #[must_use]
    pub const fn spec(&self) -> &InstanceSpec {
        &self.spec
    }

    /// The executor running runtime commands.
    #[must_use]
    pub const fn executor(&self) -> &X {
        &self.executor
    }

    /// Handle returned by the last successful start, kept for logging.
    #[must_use]
    pub const fn last_started(&self) -> Option<&InstanceHandle> {
        self.last_started.as_ref()
    }
}

impl<X: CommandExecutor, S: Sleeper> InstanceController<X, S> {
    /// Asks the runtime for the running instance matching the instance spec.
    ///
    /// An empty handle means the runtime confirmed nothing is running.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Query`] when the query command fails, so a
    /// failed query is never mistaken for a stopped instance.
    pub fn query_handle(&self) -> Result<InstanceHandle, ControllerError> {
        let command = self.commands.query(&self.spec)?;
        match self.executor.execute(&command) {
            CommandOutcome::Success { stdout } => Ok(InstanceHandle::new(stdout)),
            CommandOutcome::Failure(failure) => Err(ControllerError::Query {
                name: self.spec.name().to_owned(),
                failure,
            }),
        }
    }

    /// Ensures the instance is running and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Launch`] when the runtime refuses the launch,
    /// [`ControllerError::StartTimeout`] when the instance never becomes
    /// observable, and [`ControllerError::Unavailable`] when the runtime cannot
    /// be queried at all.
    pub fn start(&mut self) -> Result<InstanceHandle, ControllerError> {
        let current = self.observe()?;
        if current.is_running() {
            info!(
                target: CONTROLLER_TARGET,
                instance = self.spec.name(),
                handle = %current,
                "instance already running"
            );
            return Ok(current);
        }

        info!(
            target: CONTROLLER_TARGET,
            instance = self.spec.name(),
            ports = self.spec.port_mapping(),
            "starting instance"
        );
        let launch = self.commands.launch(&self.spec)?;
        if let CommandOutcome::Failure(failure) = self.executor.execute(&launch) {
            return Err(ControllerError::Launch {
                name: self.spec.name().to_owned(),
                failure,
            });
        }

        self.retrier.sleeper().sleep(self.grace.start);
        let handle = self
            .retrier
            .retry_until(InstanceHandle::is_running, || self.query_handle())
            .map_err(|err| match err {
                RetryError::Fatal { source, .. } => source,
                RetryError::Exhausted { attempts, .. } => ControllerError::StartTimeout {
                    name: self.spec.name().to_owned(),
                    attempts,
                },
            })?;

        info!(
            target: CONTROLLER_TARGET,
            instance = self.spec.name(),
            handle = %handle,
            "instance started"
        );
        self.last_started = Some(handle.clone());
        Ok(handle)
    }

    /// Ensures the instance is stopped and returns the handle that was
    /// running, or the empty handle when nothing was.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Stop`] when the runtime refuses the stop,
    /// [`ControllerError::StopTimeout`] when the instance remains observable,
    /// and [`ControllerError::Unavailable`] when the runtime cannot be queried
    /// at all.
    pub fn stop(&mut self) -> Result<InstanceHandle, ControllerError> {
        let current = self.observe()?;
        if !current.is_running() {
            info!(
                target: CONTROLLER_TARGET,
                instance = self.spec.name(),
                "no running instance to stop"
            );
            return Ok(current);
        }

        if let Some(started) = self.last_started.as_ref().filter(|started| **started != current) {
            warn!(
                target: CONTROLLER_TARGET,
                instance = self.spec.name(),
                started = %started,
                running = %current,
                "running instance differs from the one this controller started"
            );
        }

        info!(
            target: CONTROLLER_TARGET,
            instance = self.spec.name(),
            handle = %current,
            "stopping instance"
        );
        let stop = self.commands.stop(&current)?;
        if let CommandOutcome::Failure(failure) = self.executor.execute(&stop) {
            return Err(ControllerError::Stop {
                name: self.spec.name().to_owned(),
                handle: current,
                failure,
            });
        }

        self.retrier.sleeper().sleep(self.grace.stop);
        debug!(
            target: CONTROLLER_TARGET,
            instance = self.spec.name(),
            handle = %current,
            "waiting for instance to stop"
        );
        self.retrier
            .retry_until(|handle: &InstanceHandle| !handle.is_running(), || {
                self.query_handle()
            })
            .map_err(|err| match err {
                RetryError::Fatal { source, .. } => source,
                RetryError::Exhausted { attempts, .. } => ControllerError::StopTimeout {
                    name: self.spec.name().to_owned(),
                    handle: current.clone(),
                    attempts,
                },
            })?;

        info!(
            target: CONTROLLER_TARGET,
            instance = self.spec.name(),
            handle = %current,
            "instance stopped"
        );
        self.last_started = None;
        Ok(current)
    }

    /// Queries the current handle, retrying transient query failures.
    fn observe(&self) -> Result<InstanceHandle, ControllerError> {
        self.retrier
            .retry_until(|_: &InstanceHandle| true, || self.query_handle())
            .map_err(|err| match err {
                RetryError::Fatal { source, .. } => source,
                RetryError::Exhausted {
                    attempts,
                    last_error,
                    ..
                } => ControllerError::Unavailable {
                    name: self.spec.name().to_owned(),
                    attempts,
                    source: last_error.map(Box::new),
                },
            })
    }
}

impl<X: CommandExecutor, S: Sleeper> Lifecycle for InstanceController<X, S> {
    fn start(&mut self) -> Result<InstanceHandle, ControllerError> {
        Self::start(self)
    }

    fn stop(&mut self) -> Result<InstanceHandle, ControllerError> {
        Self::stop(self)
    }

    fn status(&self) -> Result<InstanceHandle, ControllerError> {
        self.observe()
    }
}
