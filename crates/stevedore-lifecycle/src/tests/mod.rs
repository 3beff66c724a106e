//! Crate-level integration and BDD tests.

use stevedore_config::ScopeSelector;

use crate::controller::{InstanceController, InstanceSpec};
use crate::scope::{LifecycleHooks, ScopeBinding, SessionGuard};
use crate::testing::{FakeRuntime, RecordingSleeper};


#[test]
fn end_to_end_session_with_fake_runtime() {
    let runtime = FakeRuntime::stopped().with_start_delay(1);
    let sleeper = RecordingSleeper::new();
    let controller = InstanceController::new(InstanceSpec::new("svc", "8000:8000"), &runtime)
        .with_sleeper(&sleeper);
    let mut binding = ScopeBinding::new(controller, true, ScopeSelector::Session);

    let mut session = SessionGuard::begin(&mut binding).expect("begin");
    for unit in ["a", "b", "c"] {
        session.run_unit(unit, || ()).expect("unit");
    }
    session.finish().expect("finish");

    assert_eq!(runtime.launches(), 1);
    assert_eq!(runtime.stops(), 1);
    assert!(!runtime.is_running());
}

#[test]
fn stop_before_any_start_is_a_no_op() {
    let runtime = FakeRuntime::stopped();
    let sleeper = RecordingSleeper::new();
    let controller = InstanceController::new(InstanceSpec::new("svc", "8000:8000"), &runtime)
        .with_sleeper(&sleeper);
    let mut binding = ScopeBinding::new(controller, true, ScopeSelector::Session);

    let outcome = binding.on_session_end().expect("session end");

    assert_eq!(outcome.handle().map(|handle| handle.is_running()), Some(false));
    assert_eq!(runtime.stops(), 0);
}
