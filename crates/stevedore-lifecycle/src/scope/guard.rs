//! RAII bracket around a session of work.

use tracing::{error, warn};

use super::{HookOutcome, LifecycleHooks, SCOPE_TARGET};
use crate::error::ControllerError;

/// Fires the session start hook on creation and the session end hook when
/// finished or dropped.
///
/// Prefer [`SessionGuard::finish`] so teardown failures reach the caller;
/// the [`Drop`] fallback can only log them.
#[derive(Debug)]
pub struct SessionGuard<'a, H: LifecycleHooks> {
    hooks: &'a mut H,
    finished: bool,
}

impl<'a, H: LifecycleHooks> SessionGuard<'a, H> {
    /// Fires `on_session_start` and returns the guard.
    ///
    /// When the start hook fails the end hook is still attempted so a
    /// half-started instance is not left behind.
    ///
    /// # Errors
    ///
    /// Returns the start hook's error.
    pub fn begin(hooks: &'a mut H) -> Result<Self, ControllerError> {
        match hooks.on_session_start() {
            Ok(_) => Ok(Self {
                hooks,
                finished: false,
            }),
            Err(err) => {
                if let Err(cleanup) = hooks.on_session_end() {
                    warn!(
                        target: SCOPE_TARGET,
                        error = %cleanup,
                        "cleanup after failed session start also failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Runs `work` between the unit start and end hooks.
    ///
    /// The end hook fires whenever the start hook was attempted, including
    /// when the start hook failed and `work` was skipped, and while unwinding
    /// from a panic in `work`.
    ///
    /// # Errors
    ///
    /// Returns the start hook's error (without running `work`) or the end
    /// hook's error.
    pub fn run_unit<T, F>(&mut self, unit: &str, work: F) -> Result<T, ControllerError>
    where
        F: FnOnce() -> T,
    {
        if let Err(err) = self.hooks.on_unit_start(unit) {
            if let Err(cleanup) = self.hooks.on_unit_end(unit) {
                warn!(
                    target: SCOPE_TARGET,
                    unit,
                    error = %cleanup,
                    "cleanup after failed unit start also failed"
                );
            }
            return Err(err);
        }
        let mut pending = PendingUnitEnd {
            hooks: &mut *self.hooks,
            unit,
            armed: true,
        };
        let value = work();
        pending.armed = false;
        pending.hooks.on_unit_end(unit)?;
        Ok(value)
    }

    /// Fires `on_session_end` and reports its outcome.
    ///
    /// # Errors
    ///
    /// Returns the end hook's error.
    pub fn finish(mut self) -> Result<HookOutcome, ControllerError> {
        self.finished = true;
        self.hooks.on_session_end()
    }
}

impl<H: LifecycleHooks> Drop for SessionGuard<'_, H> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.hooks.on_session_end() {
            error!(
                target: SCOPE_TARGET,
                error = %err,
                "session teardown failed"
            );
        }
    }
}

/// Fires `on_unit_end` if a unit's work unwinds before returning.
struct PendingUnitEnd<'g, H: LifecycleHooks> {
    hooks: &'g mut H,
    unit: &'g str,
    armed: bool,
}

impl<H: LifecycleHooks> Drop for PendingUnitEnd<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.hooks.on_unit_end(self.unit) {
            error!(
                target: SCOPE_TARGET,
                unit = self.unit,
                error = %err,
                "unit teardown after panic failed"
            );
        }
    }
}
