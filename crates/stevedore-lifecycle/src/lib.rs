//! Lifecycle management for ephemeral test dependencies.
//!
//! The `stevedore-lifecycle` crate guarantees that a single containerised
//! dependency is running before a scope of work begins and is torn down when
//! that scope ends. Start and stop are idempotent: each operation queries the
//! container runtime first and only acts when the observed state differs from
//! the requested one.
//!
//! # Architecture
//!
//! Four layers, each depending only on the one below:
//!
//! - [`command`] runs runtime command lines through the [`CommandExecutor`]
//!   seam and reports a [`CommandOutcome`] instead of raising.
//! - [`backoff`] re-invokes an operation with capped exponential waits until a
//!   predicate holds or the attempt ceiling is reached.
//! - [`controller`] owns the start/stop state machine for one
//!   [`InstanceSpec`]: query, act, grace period, poll.
//! - [`scope`] routes session and unit lifecycle events onto the controller,
//!   gated by the enabled flag and the configured [`ScopeSelector`].
//!
//! # Example
//!
//! ```rust,no_run
//! use stevedore_config::Config;
//! use stevedore_lifecycle::{ScopeBinding, SessionGuard};
//!
//! # fn main() -> Result<(), stevedore_lifecycle::ControllerError> {
//! let config = Config::default();
//! let mut binding = ScopeBinding::from_config(&config);
//! let mut session = SessionGuard::begin(&mut binding)?;
//! session.run_unit("smoke", || {
//!     // talk to the dependency here
//! })?;
//! session.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ScopeSelector`]: stevedore_config::ScopeSelector

pub mod backoff;
pub mod command;
pub mod controller;
pub mod error;
pub mod scope;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use self::backoff::{BackoffRetrier, RetryError, RetryPolicy, Sleeper, ThreadSleeper};
pub use self::command::{CommandExecutor, CommandFailure, CommandLine, CommandOutcome, SystemExecutor};
pub use self::controller::{
    GracePeriods, InstanceController, InstanceHandle, InstanceSpec, Lifecycle, RuntimeCommands,
};
pub use self::error::{CommandError, ControllerError};
pub use self::scope::{HookOutcome, LifecycleHooks, ScopeBinding, SessionGuard};
pub use self::telemetry::{TelemetryError, TelemetryHandle};
