//! Error taxonomy
//!
//! Construction and resolution errors are raised while a tree is built, before
//! any test runs. Per-test failures are not errors here: they are recorded as
//! [`crate::Failure`] values inside each [`crate::TestResult`]. Only
//! [`RunError::Unrecoverable`] aborts a run in progress.

use std::fmt;
use std::path::PathBuf;

/// Kind of registration that needs an existing fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// `derive_fixture`
    Derivation,
    /// `before`
    Setup,
    /// `after`
    Teardown,
    /// `fixture_from_parent`
    ParentFactory,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepKind::Derivation => "derivation step",
            StepKind::Setup => "setup action",
            StepKind::Teardown => "teardown action",
            StepKind::ParentFactory => "parent-derived fixture factory",
        };
        f.write_str(label)
    }
}

/// A step needs a fixture that nothing on its path establishes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// No base factory at or above the context and the fixture type cannot be synthesized
    #[error("{step} registered at '{path}' but no fixture of type `{fixture_type}` exists on that path")]
    NoAntecedent {
        /// Joined path of the offending context
        path: String,
        /// What was registered
        step: StepKind,
        /// Type name of the fixture the step expects
        fixture_type: &'static str,
    },
}

/// Invalid tree construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// Registration attempted after the suite was sealed for execution
    #[error("cannot register '{name}': the suite is sealed for execution")]
    Sealed {
        /// Name of the tree that was rejected
        name: String,
    },

    /// A context or test was given a blank name
    #[error("a context or test under '{parent}' has an empty name")]
    EmptyName {
        /// Joined path of the enclosing context
        parent: String,
    },

    /// A leaf needs a fixture but none is established on its path
    #[error("test '{path}' has no fixture factory on its path and `{fixture_type}` cannot be synthesized")]
    MissingFixture {
        /// Joined path of the leaf test
        path: String,
        /// Type name of the fixture the leaf expects
        fixture_type: &'static str,
    },

    /// A registered step has no fixture to work on
    #[error(transparent)]
    FixtureResolution(#[from] ResolutionError),
}

/// Errors that abort a whole run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// The tree failed validation when re-checked at the start of the run
    #[error("tree failed validation: {0}")]
    Construction(#[from] ConstructionError),

    /// The engine's own bookkeeping is inconsistent; the tree can no longer be trusted
    #[error("unrecoverable engine error: {message}")]
    Unrecoverable {
        /// What went wrong
        message: String,
    },
}

impl RunError {
    /// Create an unrecoverable error
    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self::Unrecoverable {
            message: message.into(),
        }
    }
}

/// Errors loading or validating a [`crate::RunConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for a run configuration
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file is not valid JSON for a run configuration
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension is neither `.toml` nor `.json`
    #[error("unsupported config format: {}", .path.display())]
    UnsupportedFormat {
        /// File with the unrecognized extension
        path: PathBuf,
    },

    /// An environment override could not be parsed
    #[error("invalid value '{value}' in {key}")]
    Env {
        /// Environment variable name
        key: String,
        /// Value that was rejected
        value: String,
    },

    /// The configuration failed validation
    #[error("invalid configuration: {message}")]
    Invalid {
        /// What is wrong
        message: String,
    },
}

impl ConfigError {
    /// Create a validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
