//! Test results and the per-test lifecycle

use crate::descriptor::TestDescriptor;
use crate::outcome::Failure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Primary outcome of a single leaf test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Fixture, setup and body all completed
    Passed,
    /// The first failure seen in fixture resolution, setup or the body
    Failed(Failure),
    /// Not executed; no fixture, setup, body or teardown ran
    Skipped,
}

/// Why a test was reported as skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The test or one of its ancestor contexts was marked skipped
    Marked,
    /// The run configuration filter did not match the test path
    Filtered,
    /// Another node in the run is focused and this test is not under it
    NotFocused,
    /// An earlier test failed and the run is configured to fail fast
    FailFast,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Marked => "marked skipped",
            SkipReason::Filtered => "filtered out",
            SkipReason::NotFocused => "not focused",
            SkipReason::FailFast => "fail-fast",
        };
        f.write_str(label)
    }
}

/// Lifecycle of one leaf test.
///
/// `Pending → (Skipped | Running) → (Passed | Failed) → TearingDown → Reported`;
/// a skipped test goes straight from `Skipped` to `Reported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseState {
    /// Planned, not yet started
    Pending,
    /// Will not run
    Skipped,
    /// Fixture resolution, setup and body in progress
    Running,
    /// Body completed without failure
    Passed,
    /// Fixture, setup or body failed
    Failed,
    /// Teardown actions executing
    TearingDown,
    /// Result handed to reporters
    Reported,
}

/// Result of one leaf test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Full path of the test
    pub descriptor: TestDescriptor,
    /// Primary outcome
    pub outcome: Outcome,
    /// Failures raised by teardown actions, innermost context first
    pub teardown_failures: Vec<Failure>,
    /// Set when `outcome` is [`Outcome::Skipped`]
    pub skip_reason: Option<SkipReason>,
    /// Wall time spent on fixture, setup, body and teardown
    pub duration: Duration,
}

impl TestResult {
    /// A result for a test that never ran
    pub fn skipped(descriptor: TestDescriptor, reason: SkipReason) -> Self {
        Self {
            descriptor,
            outcome: Outcome::Skipped,
            teardown_failures: Vec::new(),
            skip_reason: Some(reason),
            duration: Duration::ZERO,
        }
    }

    /// Names from the root context to the test
    pub fn path(&self) -> &[String] {
        self.descriptor.path()
    }

    pub fn is_passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped)
    }

    /// The primary failure, if any
    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Aggregate counts over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests that passed
    pub passed: usize,
    /// Tests that failed
    pub failed: usize,
    /// Tests reported skipped
    pub skipped: usize,
    /// Number of individual teardown failures across all tests
    pub teardown_failures: usize,
}

impl RunSummary {
    /// Count outcomes in `results`
    pub fn from_results(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            match result.outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed(_) => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
            summary.teardown_failures += result.teardown_failures.len();
            summary
        })
    }

    /// Number of results counted
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// No failed test and no failed teardown
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.teardown_failures == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed, self.failed, self.skipped
        )?;
        if self.teardown_failures > 0 {
            write!(f, ", {} teardown failures", self.teardown_failures)?;
        }
        Ok(())
    }
}
