//! Test Execution Driver
//!
//! Plans a tree into leaf tests, depth-first in declaration order, and runs them
//! one at a time. Each test gets a freshly resolved fixture; teardown runs for
//! every context whose setup began, whatever the body did. Failures are recorded
//! per test and the run moves on; only [`RunError`] stops it.

use crate::report::Reporter;
use crate::resolve::{Execution, Slot};
use crate::tree::{plan_root, Node, PlannedCase, TestTree};
use nestspec_core::{
    CaseState, ConfigError, RunConfig, RunError, RunSummary, SkipReason, TestDescriptor, TestResult,
};
use std::time::Instant;

/// A root context together with its planned leaf tests
pub(crate) struct PlannedRoot<'t> {
    node: &'t dyn Node<()>,
    cases: Vec<PlannedCase>,
}

impl<'t> PlannedRoot<'t> {
    pub(crate) fn new(node: &'t dyn Node<()>) -> Self {
        Self {
            node,
            cases: plan_root(node),
        }
    }
}

/// Executes trees and suites under a [`RunConfig`]
#[derive(Default)]
pub struct Runner {
    config: RunConfig,
    reporters: Vec<Box<dyn Reporter>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("reporters", &self.reporters.len())
            .finish()
    }
}

impl Runner {
    /// Create a runner with no reporters; `config` is validated first
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            reporters: Vec::new(),
        })
    }

    /// Configuration this runner applies
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Add a reporter; reporters are notified in registration order
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// Add a boxed reporter
    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    /// Run every leaf test of `tree`, returning one result per leaf in
    /// declaration order.
    ///
    /// The tree is validated again first. Failing tests do not stop the run.
    pub fn run<F: 'static>(&mut self, tree: &TestTree<F>) -> Result<Vec<TestResult>, RunError> {
        tree.validate()?;
        let planned = [PlannedRoot::new(tree.root_node())];
        self.run_planned(tree.name(), &planned)
    }

    pub(crate) fn run_planned(
        &mut self,
        suite: &str,
        roots: &[PlannedRoot<'_>],
    ) -> Result<Vec<TestResult>, RunError> {
        let planned: usize = roots.iter().map(|root| root.cases.len()).sum();
        let focus_active = self.config.honor_focus
            && roots
                .iter()
                .flat_map(|root| root.cases.iter())
                .any(PlannedCase::is_focused);

        let span = tracing::info_span!("run", suite, planned);
        let _entered = span.enter();
        if focus_active {
            tracing::debug!("focused tests present; unfocused tests will be skipped");
        }
        for reporter in &mut self.reporters {
            reporter.run_started(suite, planned);
        }

        let mut results = Vec::with_capacity(planned);
        let mut halted = false;
        for root in roots {
            for case in &root.cases {
                let skip = self.skip_reason(case, focus_active, halted);
                let result = self.run_case(root.node, case, skip)?;
                if result.is_failed() && self.config.fail_fast {
                    halted = true;
                }
                results.push(result);
            }
        }

        let summary = RunSummary::from_results(&results);
        tracing::debug!(%summary, "run complete");
        for reporter in &mut self.reporters {
            reporter.run_finished(&summary);
        }
        Ok(results)
    }

    fn skip_reason(&self, case: &PlannedCase, focus_active: bool, halted: bool) -> Option<SkipReason> {
        if case.is_skipped() {
            return Some(SkipReason::Marked);
        }
        if let Some(filter) = &self.config.filter {
            if !case.descriptor().matches(filter, &self.config.path_separator) {
                return Some(SkipReason::Filtered);
            }
        }
        if focus_active && !case.is_focused() {
            return Some(SkipReason::NotFocused);
        }
        if halted {
            return Some(SkipReason::FailFast);
        }
        None
    }

    fn run_case(
        &mut self,
        root: &dyn Node<()>,
        case: &PlannedCase,
        skip: Option<SkipReason>,
    ) -> Result<TestResult, RunError> {
        let descriptor = case.descriptor();
        let path = descriptor.joined(&self.config.path_separator);
        let span = tracing::debug_span!("case", %path);
        let _entered = span.enter();

        self.transition(descriptor, CaseState::Pending);

        if let Some(reason) = skip {
            self.transition(descriptor, CaseState::Skipped);
            tracing::debug!(%reason, "skipped");
            let result = TestResult::skipped(descriptor.clone(), reason);
            self.report(&result);
            return Ok(result);
        }

        self.transition(descriptor, CaseState::Running);
        let started = Instant::now();
        let mut exec = Execution::new(descriptor);
        let mut unit = Slot::filled(());
        root.execute(&case.route, &mut unit, &mut exec)?;
        // A failure before the root context's setup leaves no teardown to run.
        exec.enter_teardown();

        for state in exec.take_transitions() {
            self.transition(descriptor, state);
        }
        let result = exec.finish(started.elapsed())?;

        if let Some(failure) = result.failure() {
            tracing::warn!(%path, %failure, "test failed");
        }
        for failure in &result.teardown_failures {
            tracing::warn!(%path, %failure, "teardown failed");
        }
        self.report(&result);
        Ok(result)
    }

    fn transition(&mut self, descriptor: &TestDescriptor, state: CaseState) {
        tracing::debug!(?state, "case state");
        for reporter in &mut self.reporters {
            reporter.case_state(descriptor, state);
        }
    }

    fn report(&mut self, result: &TestResult) {
        for reporter in &mut self.reporters {
            reporter.case_finished(result);
        }
        self.transition(&result.descriptor, CaseState::Reported);
    }
}

/// Run `tree` with the default configuration
pub fn run<F: 'static>(tree: &TestTree<F>) -> Result<Vec<TestResult>, RunError> {
    Runner::default().run(tree)
}
