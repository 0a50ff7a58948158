//! Reporters
//!
//! Rendering results (console output, files, CI annotations) is left to
//! whoever consumes the run. A [`Reporter`] observes the run as it happens;
//! two implementations ship here: [`TracingReporter`] for log output and
//! [`RecordingReporter`] for inspecting a run from tests.

use nestspec_core::{CaseState, Outcome, RunSummary, TestDescriptor, TestResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer of a run
pub trait Reporter: Send {
    /// A suite or tree is about to run `planned` leaf tests
    fn run_started(&mut self, _suite: &str, _planned: usize) {}

    /// A leaf test moved to `state`
    fn case_state(&mut self, _descriptor: &TestDescriptor, _state: CaseState) {}

    /// A leaf test produced its result
    fn case_finished(&mut self, result: &TestResult);

    /// Every planned test has been reported
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Logs one line per test and a summary through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn run_started(&mut self, suite: &str, planned: usize) {
        tracing::info!(suite, planned, "running tests");
    }

    fn case_finished(&mut self, result: &TestResult) {
        let path = result.descriptor.to_string();
        match &result.outcome {
            Outcome::Passed => tracing::info!(%path, elapsed = ?result.duration, "ok"),
            Outcome::Failed(failure) => tracing::warn!(%path, %failure, "FAILED"),
            Outcome::Skipped => {
                let reason = result.skip_reason.map(|reason| reason.to_string());
                tracing::info!(%path, reason = reason.as_deref().unwrap_or("skipped"), "skipped");
            }
        }
        for failure in &result.teardown_failures {
            tracing::warn!(%path, %failure, "teardown failure");
        }
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        if summary.is_success() {
            tracing::info!(%summary, "test run succeeded");
        } else {
            tracing::warn!(%summary, "test run failed");
        }
    }
}

/// Everything a [`RecordingReporter`] saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// [`Reporter::run_started`]
    RunStarted {
        /// Suite or tree name
        suite: String,
        /// Number of planned leaf tests
        planned: usize,
    },
    /// [`Reporter::case_state`]
    State {
        /// Test that changed state
        descriptor: TestDescriptor,
        /// State it moved to
        state: CaseState,
    },
    /// [`Reporter::case_finished`]
    Finished(TestResult),
    /// [`Reporter::run_finished`]
    RunFinished(RunSummary),
}

/// Records every event; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl RecordingReporter {
    /// Create a reporter with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }

    /// Lifecycle states reported for one test, in order
    pub fn states_for(&self, descriptor: &TestDescriptor) -> Vec<CaseState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::State {
                    descriptor: seen,
                    state,
                } if seen == descriptor => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// Results in the order they were reported
    pub fn results(&self) -> Vec<TestResult> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Finished(result) => Some(result.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn run_started(&mut self, suite: &str, planned: usize) {
        self.events.lock().push(ReportEvent::RunStarted {
            suite: suite.to_string(),
            planned,
        });
    }

    fn case_state(&mut self, descriptor: &TestDescriptor, state: CaseState) {
        self.events.lock().push(ReportEvent::State {
            descriptor: descriptor.clone(),
            state,
        });
    }

    fn case_finished(&mut self, result: &TestResult) {
        self.events.lock().push(ReportEvent::Finished(result.clone()));
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        self.events.lock().push(ReportEvent::RunFinished(*summary));
    }
}
