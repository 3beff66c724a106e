//! Routing of test-runner lifecycle events onto an instance controller.
//!
//! An embedding runner calls the four [`LifecycleHooks`] as sessions and
//! units of work begin and end. [`ScopeBinding`] decides from its
//! configuration whether an event should start or stop the managed instance;
//! every other event is a no-op reported as [`HookOutcome::Skipped`]. The
//! binding keeps no state of its own beyond that configuration.

mod guard;

use stevedore_config::{Config, ScopeSelector};
use tracing::{debug, info};

pub use self::guard::SessionGuard;
use crate::command::SystemExecutor;
use crate::controller::{InstanceController, InstanceHandle, Lifecycle};
use crate::error::ControllerError;

/// Tracing target for hook routing.
const SCOPE_TARGET: &str = "stevedore_lifecycle::scope";

/// What a hook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// The event did not match the configured scope, or management is off.
    Skipped,
    /// The instance was started (or was already running) with this handle.
    Started(InstanceHandle),
    /// The instance was stopped; the handle is empty if nothing was running.
    Stopped(InstanceHandle),
}

impl HookOutcome {
    /// Returns `true` when the hook did not act.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Handle reported by an acting hook.
    #[must_use]
    pub const fn handle(&self) -> Option<&InstanceHandle> {
        match self {
            Self::Skipped => None,
            Self::Started(handle) | Self::Stopped(handle) => Some(handle),
        }
    }
}

/// Lifecycle callbacks an embedding test runner invokes.
pub trait LifecycleHooks {
    /// Called once before any unit of work runs.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when a required start failed.
    fn on_session_start(&mut self) -> Result<HookOutcome, ControllerError>;

    /// Called once after every unit of work has finished.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when a required stop failed.
    fn on_session_end(&mut self) -> Result<HookOutcome, ControllerError>;

    /// Called before the named unit of work runs.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when a required start failed.
    fn on_unit_start(&mut self, unit: &str) -> Result<HookOutcome, ControllerError>;

    /// Called after the named unit of work has finished.
    ///
    /// # Errors
    ///
    /// Returns a [`ControllerError`] when a required stop failed.
    fn on_unit_end(&mut self, unit: &str) -> Result<HookOutcome, ControllerError>;
}

#[derive(Debug, Clone, Copy)]
enum Event<'a> {
    SessionStart,
    SessionEnd,
    UnitStart(&'a str),
    UnitEnd(&'a str),
}

impl<'a> Event<'a> {
    const fn scope(self) -> ScopeSelector {
        match self {
            Self::SessionStart | Self::SessionEnd => ScopeSelector::Session,
            Self::UnitStart(_) | Self::UnitEnd(_) => ScopeSelector::Unit,
        }
    }

    const fn starts(self) -> bool {
        matches!(self, Self::SessionStart | Self::UnitStart(_))
    }

    const fn unit(self) -> Option<&'a str> {
        match self {
            Self::UnitStart(unit) | Self::UnitEnd(unit) => Some(unit),
            Self::SessionStart | Self::SessionEnd => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::UnitStart(_) => "unit_start",
            Self::UnitEnd(_) => "unit_end",
        }
    }
}

/// Maps lifecycle events onto start/stop calls of an owned [`Lifecycle`].
#[derive(Debug)]
pub struct ScopeBinding<L> {
    lifecycle: L,
    enabled: bool,
    scope: ScopeSelector,
}

impl ScopeBinding<InstanceController<SystemExecutor>> {
    /// Builds the production binding described by the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            InstanceController::from_config(config),
            config.manage_instance(),
            config.instance_scope(),
        )
    }
}

impl<L> ScopeBinding<L> {
    /// Creates a binding that owns `lifecycle`.
    #[must_use]
    pub const fn new(lifecycle: L, enabled: bool, scope: ScopeSelector) -> Self {
        Self {
            lifecycle,
            enabled,
            scope,
        }
    }

    /// Whether hooks act at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Scope whose events trigger start and stop.
    #[must_use]
    pub const fn scope(&self) -> ScopeSelector {
        self.scope
    }

    /// The owned lifecycle.
    #[must_use]
    pub const fn lifecycle(&self) -> &L {
        &self.lifecycle
    }

    /// Releases the owned lifecycle.
    #[must_use]
    pub fn into_inner(self) -> L {
        self.lifecycle
    }
}

impl<L: Lifecycle> ScopeBinding<L> {
    fn route(&mut self, event: Event<'_>) -> Result<HookOutcome, ControllerError> {
        if !self.enabled || event.scope() != self.scope {
            debug!(
                target: SCOPE_TARGET,
                event = event.name(),
                unit = event.unit(),
                enabled = self.enabled,
                scope = %self.scope,
                "hook skipped"
            );
            return Ok(HookOutcome::Skipped);
        }

        let outcome = if event.starts() {
            HookOutcome::Started(self.lifecycle.start()?)
        } else {
            HookOutcome::Stopped(self.lifecycle.stop()?)
        };
        info!(
            target: SCOPE_TARGET,
            event = event.name(),
            unit = event.unit(),
            handle = ?outcome.handle().map(ToString::to_string),
            "hook completed"
        );
        Ok(outcome)
    }
}

impl<L: Lifecycle> LifecycleHooks for ScopeBinding<L> {
    fn on_session_start(&mut self) -> Result<HookOutcome, ControllerError> {
        self.route(Event::SessionStart)
    }

    fn on_session_end(&mut self) -> Result<HookOutcome, ControllerError> {
        self.route(Event::SessionEnd)
    }

    fn on_unit_start(&mut self, unit: &str) -> Result<HookOutcome, ControllerError> {
        self.route(Event::UnitStart(unit))
    }

    fn on_unit_end(&mut self, unit: &str) -> Result<HookOutcome, ControllerError> {
        self.route(Event::UnitEnd(unit))
    }
}
