//! Fixture Resolution Engine
//!
//! A fixture is resolved fresh for every leaf by walking the route from the root
//! context down to the leaf. At each context on the way:
//!
//! 1. a base factory, if registered, replaces the working fixture
//! 2. derivation steps run in registration order, each reading the working
//!    fixture and producing the next one into the context's own slot
//! 3. setup actions run in registration order against the working fixture
//!
//! and on the way back up, every context whose setup phase began runs its
//! teardown actions, innermost context first. An inherited fixture is only ever
//! borrowed by a child, so it is still in place when its owner tears down.
//!
//! Panics and returned errors from user code are caught here and recorded on the
//! [`Execution`] as per-test failures; only inconsistencies in the engine's own
//! bookkeeping surface as [`RunError::Unrecoverable`].

use crate::tree::{Action, FixtureFactory, Step};
use nestspec_core::{CaseState, Failure, FailurePhase, Outcome, RunError, TestDescriptor, TestResult};
use std::any::{Any, TypeId};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Working fixture storage for one context level
pub(crate) struct Slot<F>(Option<F>);

impl<F> Slot<F> {
    /// The "no fixture" marker
    pub(crate) fn empty() -> Self {
        Self(None)
    }

    pub(crate) fn filled(fixture: F) -> Self {
        Self(Some(fixture))
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) fn put(&mut self, fixture: F) {
        self.0 = Some(fixture);
    }

    pub(crate) fn get(&self) -> Option<&F> {
        self.0.as_ref()
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut F> {
        self.0.as_mut()
    }
}

/// Whether `F` can be synthesized without a factory
pub(crate) fn is_unit<F: 'static>() -> bool {
    TypeId::of::<F>() == TypeId::of::<()>()
}

/// `Some(())` when `F` is the unit type, `None` for every other fixture type
pub(crate) fn unit_fixture<F: 'static>() -> Option<F> {
    let unit: Box<dyn Any> = Box::new(());
    unit.downcast::<F>().ok().map(|fixture| *fixture)
}

/// Run user code, turning a panic into a failure for `phase`
pub(crate) fn guarded<T>(phase: FailurePhase, f: impl FnOnce() -> T) -> Result<T, Failure> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| Failure::from_panic(phase, payload.as_ref()))
}

/// Run a setup, teardown or body action; both panics and returned errors fail
pub(crate) fn guarded_action(
    phase: FailurePhase,
    f: impl FnOnce() -> Result<(), String>,
) -> Result<(), Failure> {
    guarded(phase, f)?.map_err(|message| Failure::new(phase, message))
}

/// Per-leaf execution record threaded through every context on the route
pub(crate) struct Execution<'d> {
    descriptor: &'d TestDescriptor,
    failure: Option<Failure>,
    teardown_failures: Vec<Failure>,
    transitions: Vec<CaseState>,
    body_ran: bool,
    tearing_down: bool,
}

impl<'d> Execution<'d> {
    pub(crate) fn new(descriptor: &'d TestDescriptor) -> Self {
        Self {
            descriptor,
            failure: None,
            teardown_failures: Vec::new(),
            transitions: Vec::new(),
            body_ran: false,
            tearing_down: false,
        }
    }

    /// Identity of the leaf being executed; handed to every factory and action
    pub(crate) fn descriptor(&self) -> &'d TestDescriptor {
        self.descriptor
    }

    pub(crate) fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Record the primary failure. Only the first one counts.
    pub(crate) fn fail(&mut self, failure: Failure) {
        if self.failure.is_some() {
            return;
        }
        tracing::debug!(phase = %failure.phase, message = %failure.message, "case failed");
        self.transitions.push(CaseState::Failed);
        self.failure = Some(failure);
    }

    pub(crate) fn body_finished(&mut self, outcome: Result<(), Failure>) {
        self.body_ran = true;
        match outcome {
            Ok(()) => self.transitions.push(CaseState::Passed),
            Err(failure) => self.fail(failure),
        }
    }

    pub(crate) fn enter_teardown(&mut self) {
        if !self.tearing_down {
            self.tearing_down = true;
            self.transitions.push(CaseState::TearingDown);
        }
    }

    pub(crate) fn teardown_failed(&mut self, failure: Failure) {
        tracing::debug!(message = %failure.message, "teardown failed");
        self.teardown_failures.push(failure);
    }

    /// States reached since the case started running, in order
    pub(crate) fn take_transitions(&mut self) -> Vec<CaseState> {
        std::mem::take(&mut self.transitions)
    }

    pub(crate) fn finish(self, duration: Duration) -> Result<TestResult, RunError> {
        let outcome = match self.failure {
            Some(failure) => Outcome::Failed(failure),
            None if self.body_ran => Outcome::Passed,
            None => {
                return Err(RunError::unrecoverable(format!(
                    "'{}' finished without running its body or recording a failure",
                    self.descriptor
                )))
            }
        };

        Ok(TestResult {
            descriptor: self.descriptor.clone(),
            outcome,
            teardown_failures: self.teardown_failures,
            skip_reason: None,
            duration,
        })
    }
}

/// Invoke the base factory of a context, if any.
///
/// Runs before the context's own slot is borrowed so that a parent-derived
/// factory can read the parent fixture. Returns `None` when there is no factory
/// or when the factory failed (the failure is recorded on `exec`).
pub(crate) fn base_fixture<PF, F>(
    factory: Option<&FixtureFactory<PF, F>>,
    parent: &mut Slot<PF>,
    exec: &mut Execution<'_>,
) -> Result<Option<F>, RunError> {
    let Some(factory) = factory else {
        return Ok(None);
    };
    let descriptor = exec.descriptor();

    let produced = match factory {
        FixtureFactory::Fresh(make) => guarded(FailurePhase::Fixture, || make(descriptor)),
        FixtureFactory::FromParent(make) => {
            let parent = parent.get_mut().ok_or_else(|| {
                RunError::unrecoverable(format!(
                    "parent fixture missing while resolving '{descriptor}'"
                ))
            })?;
            guarded(FailurePhase::Fixture, || make(parent, descriptor))
        }
    };

    match produced {
        Ok(fixture) => Ok(Some(fixture)),
        Err(failure) => {
            exec.fail(failure);
            Ok(None)
        }
    }
}

/// Fold the derivation steps of one context into its own slot.
///
/// The first step reads `inherited` while `own` is still empty; each later step
/// reads what the previous one produced. A failing step leaves both slots as
/// they were.
pub(crate) fn apply_steps<F>(
    steps: &[Step<F>],
    own: &mut Slot<F>,
    inherited: Option<&Slot<F>>,
    exec: &mut Execution<'_>,
) -> Result<(), RunError> {
    let descriptor = exec.descriptor();
    for step in steps {
        let derived = {
            let current = own
                .get()
                .or_else(|| inherited.and_then(Slot::get))
                .ok_or_else(|| {
                    RunError::unrecoverable(format!(
                        "derivation step has no fixture while resolving '{descriptor}'"
                    ))
                })?;
            guarded(FailurePhase::Fixture, || step(current, descriptor))
        };
        match derived {
            Ok(next) => own.put(next),
            Err(failure) => {
                exec.fail(failure);
                break;
            }
        }
    }
    Ok(())
}

/// Run setup actions in registration order, stopping at the first failure
pub(crate) fn run_setup<F>(
    befores: &[Action<F>],
    slot: &mut Slot<F>,
    exec: &mut Execution<'_>,
) -> Result<(), RunError> {
    let descriptor = exec.descriptor();
    for action in befores {
        let fixture = slot.get_mut().ok_or_else(|| {
            RunError::unrecoverable(format!(
                "setup action has no fixture while resolving '{descriptor}'"
            ))
        })?;
        if let Err(failure) = guarded_action(FailurePhase::Setup, || action(&mut *fixture, descriptor)) {
            exec.fail(failure);
            break;
        }
    }
    Ok(())
}

/// Run teardown actions in reverse registration order. Every failure is kept.
pub(crate) fn run_teardown<F>(
    afters: &[Action<F>],
    slot: &mut Slot<F>,
    exec: &mut Execution<'_>,
) -> Result<(), RunError> {
    exec.enter_teardown();
    if afters.is_empty() {
        return Ok(());
    }

    let descriptor = exec.descriptor();
    let fixture = slot.get_mut().ok_or_else(|| {
        RunError::unrecoverable(format!(
            "teardown action has no fixture while resolving '{descriptor}'"
        ))
    })?;

    for action in afters.iter().rev() {
        if let Err(failure) = guarded_action(FailurePhase::Teardown, || action(&mut *fixture, descriptor)) {
            exec.teardown_failed(failure);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_fixture_only_for_unit() {
        assert_eq!(unit_fixture::<()>(), Some(()));
        assert_eq!(unit_fixture::<Vec<i32>>(), None);
        assert!(is_unit::<()>());
        assert!(!is_unit::<String>());
    }

    #[test]
    fn test_guarded_action_reports_errors_and_panics() {
        let err = guarded_action(FailurePhase::Setup, || Err("refused".to_string())).unwrap_err();
        assert_eq!(err, Failure::new(FailurePhase::Setup, "refused"));

        let err = guarded_action(FailurePhase::Body, || panic!("assertion")).unwrap_err();
        assert_eq!(err, Failure::new(FailurePhase::Body, "assertion"));
    }

    #[test]
    fn test_first_failure_wins() {
        let descriptor = TestDescriptor::root("case");
        let mut exec = Execution::new(&descriptor);
        exec.fail(Failure::new(FailurePhase::Setup, "first"));
        exec.fail(Failure::new(FailurePhase::Body, "second"));

        assert_eq!(exec.take_transitions(), vec![CaseState::Failed]);
        let result = exec.finish(Duration::ZERO).unwrap();
        assert_eq!(result.failure().map(|f| f.message.as_str()), Some("first"));
    }

    #[test]
    fn test_finish_without_body_is_unrecoverable() {
        let descriptor = TestDescriptor::root("case");
        let exec = Execution::new(&descriptor);
        assert!(matches!(
            exec.finish(Duration::ZERO),
            Err(RunError::Unrecoverable { .. })
        ));
    }

    #[test]
    fn test_teardown_runs_in_reverse_and_keeps_all_failures() {
        let descriptor = TestDescriptor::root("case");
        let mut exec = Execution::new(&descriptor);
        let afters: Vec<Action<Vec<&'static str>>> = vec![
            Box::new(|log: &mut Vec<&'static str>, _: &TestDescriptor| -> Result<(), String> {
                log.push("first registered");
                Err("first".to_string())
            }),
            Box::new(|log: &mut Vec<&'static str>, _: &TestDescriptor| -> Result<(), String> {
                log.push("second registered");
                panic!("second")
            }),
        ];
        let mut slot = Slot::filled(Vec::new());

        run_teardown(&afters, &mut slot, &mut exec).unwrap();

        assert_eq!(
            slot.get().unwrap(),
            &vec!["second registered", "first registered"]
        );
        assert_eq!(exec.teardown_failures.len(), 2);
        assert_eq!(exec.teardown_failures[0].message, "second");
        assert_eq!(exec.take_transitions(), vec![CaseState::TearingDown]);
    }

    #[test]
    fn test_teardown_without_fixture_is_unrecoverable() {
        let descriptor = TestDescriptor::root("case");
        let mut exec = Execution::new(&descriptor);
        let afters: Vec<Action<u32>> = vec![Box::new(|_: &mut u32, _: &TestDescriptor| -> Result<(), String> { Ok(()) })];
        let mut slot = Slot::empty();

        assert!(matches!(
            run_teardown(&afters, &mut slot, &mut exec),
            Err(RunError::Unrecoverable { .. })
        ));
    }

    #[test]
    fn test_steps_derive_from_inherited_without_consuming_it() {
        let descriptor = TestDescriptor::root("case");
        let mut exec = Execution::new(&descriptor);
        let steps: Vec<Step<Vec<u8>>> = vec![
            Box::new(|v: &Vec<u8>, _: &TestDescriptor| -> Vec<u8> {
                let mut next = v.clone();
                next.push(2);
                next
            }),
            Box::new(|v: &Vec<u8>, _: &TestDescriptor| -> Vec<u8> {
                let mut next = v.clone();
                next.push(3);
                next
            }),
        ];
        let inherited = Slot::filled(vec![1]);
        let mut own = Slot::empty();

        apply_steps(&steps, &mut own, Some(&inherited), &mut exec).unwrap();

        assert!(!exec.failed());
        assert_eq!(own.get(), Some(&vec![1, 2, 3]));
        assert_eq!(inherited.get(), Some(&vec![1]));
    }

    #[test]
    fn test_failing_step_leaves_inherited_fixture_in_place() {
        let descriptor = TestDescriptor::root("case");
        let mut exec = Execution::new(&descriptor);
        let steps: Vec<Step<Vec<u8>>> = vec![Box::new(|_: &Vec<u8>, _: &TestDescriptor| -> Vec<u8> {
            panic!("cannot derive")
        })];
        let inherited = Slot::filled(vec![1]);
        let mut own = Slot::empty();

        apply_steps(&steps, &mut own, Some(&inherited), &mut exec).unwrap();

        assert!(exec.failed());
        assert!(!own.is_filled());
        assert_eq!(inherited.get(), Some(&vec![1]));
    }
}
