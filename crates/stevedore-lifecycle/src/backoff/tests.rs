//! Unit tests for the backoff schedule and retry loop.

use std::cell::Cell;
use std::fmt;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::testing::RecordingSleeper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollFault {
    Flaky,
    Broken,
}

impl fmt::Display for PollFault {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flaky => formatter.write_str("flaky"),
            Self::Broken => formatter.write_str("broken"),
        }
    }
}

impl Transient for PollFault {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Flaky)
    }
}

const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[fixture]
fn policy() -> RetryPolicy {
    RetryPolicy::new(ms(1_000), ms(10_000), 2)
}

#[rstest]
#[case::first(0, 1_000)]
#[case::second(1, 2_000)]
#[case::third(2, 4_000)]
#[case::fourth(3, 8_000)]
#[case::capped(4, 10_000)]
#[case::stays_capped(9, 10_000)]
#[case::huge_attempt(u32::MAX, 10_000)]
fn wait_grows_then_caps(policy: RetryPolicy, #[case] attempt: u32, #[case] expected: u64) {
    assert_eq!(policy.wait_for(attempt), ms(expected));
}

#[rstest]
fn waits_iterator_matches_wait_for(policy: RetryPolicy) {
    let from_iter: Vec<_> = policy.waits().take(12).collect();
    let from_index: Vec<_> = (0..12).map(|attempt| policy.wait_for(attempt)).collect();
    assert_eq!(from_iter, from_index);
}

#[test]
fn zero_multiplier_means_constant_waits() {
    let policy = RetryPolicy::new(ms(50), ms(500), 0);
    assert_eq!(policy.multiplier(), 1);
    assert!(policy.waits().take(5).all(|wait| wait == ms(50)));
}

#[rstest]
#[case::unit_multiplier(RetryPolicy::new(ms(50), ms(500), 1), ms(50))]
#[case::zero_initial_wait(RetryPolicy::new(Duration::ZERO, ms(500), 2), Duration::ZERO)]
fn stalled_schedule_resolves_late_attempts(
    #[case] policy: RetryPolicy,
    #[case] expected: Duration,
) {
    assert_eq!(policy.wait_for(u32::MAX), expected);
}

#[test]
fn zero_attempts_still_tries_once() {
    let policy = RetryPolicy::default().with_max_attempts(0);
    assert_eq!(policy.max_attempts(), 1);
}

#[test]
fn initial_wait_above_cap_is_clamped() {
    let policy = RetryPolicy::new(ms(5_000), ms(1_000), 2);
    assert_eq!(policy.wait_for(0), ms(1_000));
}

#[test]
fn policy_reads_configuration() {
    let config = Config {
        retry_initial_ms: 100,
        retry_max_ms: 400,
        retry_multiplier: 3,
        retry_max_attempts: 4,
        ..Config::default()
    };
    let policy = RetryPolicy::from_config(&config);
    assert_eq!(policy.initial_wait(), ms(100));
    assert_eq!(policy.max_wait(), ms(400));
    assert_eq!(policy.multiplier(), 3);
    assert_eq!(policy.max_attempts(), 4);
}

#[rstest]
fn accepted_first_result_does_not_sleep(policy: RetryPolicy) {
    let sleeper = RecordingSleeper::new();
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);

    let result = retrier.retry_until(|value: &u32| *value == 7, || Ok::<_, PollFault>(7));

    assert_eq!(result.ok(), Some(7));
    assert!(sleeper.waits().is_empty());
}

#[rstest]
fn sleeps_follow_schedule_until_accepted(policy: RetryPolicy) {
    let sleeper = RecordingSleeper::new();
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);
    let calls = Cell::new(0_u32);

    let result = retrier.retry_until(
        |value: &u32| *value >= 6,
        || {
            calls.set(calls.get() + 1);
            Ok::<_, PollFault>(calls.get())
        },
    );

    assert_eq!(result.ok(), Some(6));
    assert_eq!(
        sleeper.waits(),
        [ms(1_000), ms(2_000), ms(4_000), ms(8_000), ms(10_000)]
    );
}

#[rstest]
fn recorded_waits_never_decrease_or_exceed_cap(policy: RetryPolicy) {
    let sleeper = RecordingSleeper::new();
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);

    let result = retrier.retry_until(|_: &()| false, || Ok::<_, PollFault>(()));

    assert!(result.is_err());
    let waits = sleeper.waits();
    assert!(waits.windows(2).all(|pair| pair.first() <= pair.last()));
    assert!(waits.iter().all(|wait| *wait <= policy.max_wait()));
}

#[test]
fn exhaustion_reports_last_rejected_result() {
    let sleeper = RecordingSleeper::new();
    let policy = RetryPolicy::new(ms(10), ms(40), 2).with_max_attempts(3);
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);
    let calls = Cell::new(0_u32);

    let result = retrier.retry_until(
        |_: &u32| false,
        || {
            calls.set(calls.get() + 1);
            Ok::<_, PollFault>(calls.get())
        },
    );

    match result {
        Err(RetryError::Exhausted {
            attempts,
            last,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last, Some(3));
            assert_eq!(last_error, None);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(calls.get(), 3);
    assert_eq!(sleeper.waits(), [ms(10), ms(20)], "no wait after the final attempt");
}

#[test]
fn transient_errors_are_retried() {
    let sleeper = RecordingSleeper::new();
    let policy = RetryPolicy::new(ms(10), ms(40), 2).with_max_attempts(5);
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);
    let calls = Cell::new(0_u32);

    let result = retrier.retry_until(
        |_: &&str| true,
        || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(PollFault::Flaky)
            } else {
                Ok("ready")
            }
        },
    );

    assert_eq!(result.ok(), Some("ready"));
    assert_eq!(sleeper.waits(), [ms(10), ms(20)]);
}

#[test]
fn exhaustion_keeps_last_transient_error() {
    let sleeper = RecordingSleeper::new();
    let policy = RetryPolicy::new(ms(10), ms(40), 2).with_max_attempts(2);
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);

    let result = retrier.retry_until(|_: &()| true, || Err::<(), _>(PollFault::Flaky));

    match result {
        Err(RetryError::Exhausted {
            attempts,
            last,
            last_error,
        }) => {
            assert_eq!(attempts, 2);
            assert_eq!(last, None);
            assert_eq!(last_error, Some(PollFault::Flaky));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[rstest]
fn fatal_error_stops_immediately(policy: RetryPolicy) {
    let sleeper = RecordingSleeper::new();
    let retrier = BackoffRetrier::with_sleeper(policy, &sleeper);
    let calls = Cell::new(0_u32);

    let result = retrier.retry_until(
        |_: &()| true,
        || {
            calls.set(calls.get() + 1);
            Err::<(), _>(PollFault::Broken)
        },
    );

    match result {
        Err(RetryError::Fatal { attempt, source }) => {
            assert_eq!(attempt, 1);
            assert_eq!(source, PollFault::Broken);
        }
        other => panic!("expected fatal error, got {other:?}"),
    }
    assert_eq!(calls.get(), 1);
    assert!(sleeper.waits().is_empty());
}

#[test]
fn default_retrier_uses_default_policy() {
    let retrier: BackoffRetrier = BackoffRetrier::default();
    assert_eq!(*retrier.policy(), RetryPolicy::default());
    assert_eq!(
        retrier.policy().max_attempts(),
        RetryPolicy::DEFAULT_MAX_ATTEMPTS
    );
}
