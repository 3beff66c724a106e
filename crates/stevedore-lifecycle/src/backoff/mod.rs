//! Bounded polling with exponential backoff.
//!
//! [`BackoffRetrier::retry_until`] re-invokes an operation until a predicate
//! accepts its result, sleeping between attempts according to a
//! [`RetryPolicy`]. The wait before retry `n` (0-indexed) is
//! `initial_wait × multiplier^n`, clamped to `max_wait`. Every policy carries
//! an attempt ceiling, so a condition that can never hold ends in
//! [`RetryError::Exhausted`] instead of an endless loop.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use stevedore_lifecycle::backoff::RetryPolicy;
//!
//! let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(10), 2);
//! let waits: Vec<u64> = policy
//!     .waits()
//!     .take(6)
//!     .map(|wait| wait.as_secs())
//!     .collect();
//! assert_eq!(waits, [1, 2, 4, 8, 10, 10]);
//! ```

use std::fmt;
use std::thread;
use std::time::Duration;

use stevedore_config::Config;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Tracing target for retry bookkeeping.
const BACKOFF_TARGET: &str = "stevedore_lifecycle::backoff";

/// Deterministic backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial_wait: Duration,
    max_wait: Duration,
    multiplier: u32,
    max_attempts: u32,
}

impl Default for RetryPolicy {
    /// One second doubling up to ten seconds, ten attempts.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(10), 2)
    }
}

impl RetryPolicy {
    /// Attempt ceiling applied unless [`RetryPolicy::with_max_attempts`]
    /// overrides it.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    /// Creates a policy with the default attempt ceiling.
    ///
    /// A multiplier of zero is treated as one (constant waits).
    #[must_use]
    pub const fn new(initial_wait: Duration, max_wait: Duration, multiplier: u32) -> Self {
        Self {
            initial_wait,
            max_wait,
            multiplier: if multiplier == 0 { 1 } else { multiplier },
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Replaces the attempt ceiling. At least one attempt is always made.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Builds the policy described by the shared configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(
            config.retry_initial_wait(),
            config.retry_max_wait(),
            config.retry_multiplier(),
        )
        .with_max_attempts(config.retry_max_attempts())
    }

    /// First wait between attempts.
    #[must_use]
    pub const fn initial_wait(&self) -> Duration {
        self.initial_wait
    }

    /// Cap on any single wait.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Growth factor applied to successive waits.
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Maximum number of operation invocations.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait applied after the given 0-indexed failed attempt.
    #[must_use]
    pub fn wait_for(&self, attempt: u32) -> Duration {
        let mut wait = self.initial_wait;
        for _ in 0..attempt {
            let next = wait.saturating_mul(self.multiplier);
            if wait >= self.max_wait || next == wait {
                break;
            }
            wait = next;
        }
        wait.min(self.max_wait)
    }

    /// Endless iterator over the wait schedule.
    #[must_use]
    pub const fn waits(&self) -> Waits {
        Waits {
            next: self.initial_wait,
            max: self.max_wait,
            multiplier: self.multiplier,
        }
    }
}

/// Iterator over the waits of a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Waits {
    next: Duration,
    max: Duration,
    multiplier: u32,
}

impl Iterator for Waits {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.min(self.max);
        self.next = current.saturating_mul(self.multiplier);
        Some(current)
    }
}

/// Suspends the calling thread between attempts.
///
/// The production implementation is [`ThreadSleeper`]; tests substitute a
/// recorder so schedules can be asserted without waiting.
pub trait Sleeper {
    /// Blocks for the given duration.
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Classifies operation errors as worth retrying or fatal.
pub trait Transient {
    /// Returns `true` when another attempt could plausibly succeed.
    fn is_transient(&self) -> bool;
}

/// Reasons a [`BackoffRetrier::retry_until`] call gave up.
#[derive(Debug, Error)]
pub enum RetryError<R, E> {
    /// Every attempt ran without an accepted result.
    #[error("condition not reached after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last result the predicate rejected, if any attempt produced one.
        last: Option<R>,
        /// Last transient error observed, if any.
        last_error: Option<E>,
    },
    /// The operation raised an error that must not be retried.
    #[error("attempt {attempt} failed: {source}")]
    Fatal {
        /// 1-indexed attempt that failed.
        attempt: u32,
        /// The fatal error.
        #[source]
        source: E,
    },
}

/// Re-invokes an operation with exponential backoff until a predicate accepts
/// its result or the policy's attempt ceiling is hit.
#[derive(Debug, Clone, Default)]
pub struct BackoffRetrier<S = ThreadSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl BackoffRetrier<ThreadSleeper> {
    /// Creates a retrier that sleeps on the calling thread.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<S> BackoffRetrier<S> {
    /// Creates a retrier with a custom sleeper.
    #[must_use]
    pub const fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    /// The policy driving this retrier.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The sleeper used between attempts.
    #[must_use]
    pub const fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Splits the retrier into its policy and sleeper.
    #[must_use]
    pub fn into_parts(self) -> (RetryPolicy, S) {
        (self.policy, self.sleeper)
    }
}

impl<S: Sleeper> BackoffRetrier<S> {
    /// Invokes `operation` until `accept` returns `true` for its result.
    ///
    /// Transient errors count as a failed attempt and are retried; any other
    /// error is returned immediately. No wait follows the final attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Fatal`] for a non-transient operation error and
    /// [`RetryError::Exhausted`] once the attempt ceiling is reached.
    pub fn retry_until<R, E, A, F>(
        &self,
        mut accept: A,
        mut operation: F,
    ) -> Result<R, RetryError<R, E>>
    where
        A: FnMut(&R) -> bool,
        F: FnMut() -> Result<R, E>,
        E: Transient + fmt::Display,
    {
        let attempts = self.policy.max_attempts();
        let mut last = None;
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(target: BACKOFF_TARGET, attempt, max_attempts = attempts, "attempting operation");
            match operation() {
                Ok(result) if accept(&result) => return Ok(result),
                Ok(result) => last = Some(result),
                Err(err) if err.is_transient() => {
                    warn!(target: BACKOFF_TARGET, attempt, error = %err, "transient failure");
                    last_error = Some(err);
                }
                Err(err) => return Err(RetryError::Fatal { attempt, source: err }),
            }

            if attempt < attempts {
                let wait = self.policy.wait_for(attempt - 1);
                trace!(
                    target: BACKOFF_TARGET,
                    attempt,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "waiting before next attempt"
                );
                self.sleeper.sleep(wait);
            }
        }

        Err(RetryError::Exhausted {
            attempts,
            last,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests;
