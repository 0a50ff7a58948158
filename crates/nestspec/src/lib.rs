//! nestspec - Nested Test Contexts
//!
//! Declares tests as a tree of named contexts. Each context may register a base
//! fixture factory, derivation steps that refine the fixture inherited from its
//! parent, setup and teardown actions, nested contexts and leaf tests. Every
//! leaf runs against a fixture resolved fresh along its path from the root, so
//! tests never observe each other's state.
//!
//! ```rust
//! use nestspec::{run, TestTree};
//!
//! #[derive(Clone, Default)]
//! struct Account {
//!     balance: i64,
//! }
//!
//! let tree = TestTree::<Account>::build("an account", |root| {
//!     root.fixture(|_| Account::default());
//!     root.test("starts empty", |account, _| assert_eq!(account.balance, 0));
//!
//!     root.context("after a deposit", |ctx| {
//!         ctx.modify_fixture(|account, _| account.balance += 100);
//!         ctx.test("holds the deposit", |account, _| assert_eq!(account.balance, 100));
//!
//!         ctx.context("and a withdrawal", |ctx| {
//!             ctx.modify_fixture(|account, _| account.balance -= 30);
//!             ctx.test("holds the rest", |account, _| assert_eq!(account.balance, 70));
//!         });
//!     });
//! })
//! .unwrap();
//!
//! let results = run(&tree).unwrap();
//! assert_eq!(results.len(), 3);
//! assert!(results.iter().all(|result| result.is_passed()));
//! ```
//!
//! Failures inside fixtures, setup, bodies and teardown are captured per test.
//! Construction problems, such as a derivation step with no fixture to derive
//! from, are reported by [`TestTree::build`] before anything runs.

#![forbid(unsafe_code)]

/// Declaring contexts, fixtures and tests
pub mod builder;

/// Test logging setup
pub mod logging;

/// Run observers
pub mod report;

pub(crate) mod resolve;

/// Planning and executing trees
pub mod runner;

/// Multi-root suites
pub mod suite;

/// Immutable test trees
pub mod tree;

pub use builder::ContextBuilder;
pub use logging::init_test_logging;
pub use report::{RecordingReporter, ReportEvent, Reporter, TracingReporter};
pub use runner::{run, Runner};
pub use suite::Suite;
pub use tree::{root_context, PlannedCase, TestTree};

pub use nestspec_core::{
    CaseState, ConfigError, ConstructionError, Failure, FailurePhase, IntoOutcome, Outcome,
    ResolutionError, RunConfig, RunError, RunSummary, SkipReason, StepKind, TestDescriptor,
    TestResult,
};
