//! nestspec Core - Foundation Types
//!
//! The types shared by every layer of nestspec. Nothing in this crate builds or
//! runs a test tree; it defines the vocabulary the engine speaks:
//!
//! - [`TestDescriptor`]: the path of context names leading to a test
//! - [`IntoOutcome`] and [`Failure`]: how bodies, setup and teardown report problems
//! - [`TestResult`], [`Outcome`], [`RunSummary`]: what a run produces
//! - [`ConstructionError`], [`ResolutionError`], [`RunError`]: the error taxonomy
//! - [`RunConfig`]: filtering, fail-fast and naming options for a run

#![forbid(unsafe_code)]

/// Test identity as a path of names
pub mod descriptor;

/// Unified error handling
pub mod errors;

/// Failures and the conversion of user return values into outcomes
pub mod outcome;

/// Per-test results, lifecycle states and run summaries
pub mod result;

/// Run configuration loading and validation
pub mod config;

pub use config::RunConfig;
pub use descriptor::TestDescriptor;
pub use errors::{ConfigError, ConstructionError, ResolutionError, RunError, StepKind};
pub use outcome::{Failure, FailurePhase, IntoOutcome};
pub use result::{CaseState, Outcome, RunSummary, SkipReason, TestResult};
