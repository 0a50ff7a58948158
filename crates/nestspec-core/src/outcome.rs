//! Failures recorded against a single test
//!
//! A failure never aborts a run. Bodies, setup and teardown actions signal
//! problems either by panicking (the `assert!` family) or by returning an
//! error; both end up as a [`Failure`] tagged with the phase it came from.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Lifecycle phase in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailurePhase {
    /// A fixture factory or derivation step
    Fixture,
    /// A setup (`before`) action
    Setup,
    /// The test body
    Body,
    /// A teardown (`after`) action
    Teardown,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailurePhase::Fixture => "fixture",
            FailurePhase::Setup => "setup",
            FailurePhase::Body => "body",
            FailurePhase::Teardown => "teardown",
        };
        f.write_str(label)
    }
}

/// The recorded cause of a failed phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Where the failure happened
    pub phase: FailurePhase,
    /// Panic message or rendered error chain
    pub message: String,
}

impl Failure {
    /// Create a failure for `phase`
    pub fn new(phase: FailurePhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    /// Create a failure from a caught panic payload
    pub fn from_panic(phase: FailurePhase, payload: &(dyn Any + Send)) -> Self {
        Self::new(phase, panic_message(payload))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.message)
    }
}

/// Extract the message carried by a panic payload.
///
/// `panic!("literal")` carries a `&'static str`, formatted panics (including
/// `assert_eq!`) carry a `String`; anything else is opaque.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}

/// Conversion of a body, setup or teardown return value into an outcome.
///
/// Implemented for `()` (a plain block of assertions) and for
/// `Result<(), E>` with any error convertible into [`anyhow::Error`], so
/// bodies may use `?`.
pub trait IntoOutcome {
    /// `Ok(())` on success, the rendered error otherwise
    fn into_outcome(self) -> Result<(), String>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E> IntoOutcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|err| format!("{:#}", err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use std::panic;

    #[test]
    fn test_panic_message_from_str_and_string() {
        let payload = panic::catch_unwind(|| panic!("plain")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "plain");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");
    }

    #[test]
    fn test_panic_message_from_opaque_payload() {
        let payload = panic::catch_unwind(|| panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(
            panic_message(payload.as_ref()),
            "panicked with a non-string payload"
        );
    }

    #[test]
    fn test_unit_is_success() {
        assert_eq!(().into_outcome(), Ok(()));
    }

    #[test]
    fn test_error_chain_is_rendered() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("disk full")).context("writing snapshot");
        assert_eq!(
            result.into_outcome(),
            Err("writing snapshot: disk full".to_string())
        );
    }

    #[test]
    fn test_std_errors_convert() {
        let result: Result<(), std::fmt::Error> = Err(std::fmt::Error);
        assert!(result.into_outcome().is_err());
    }

    #[test]
    fn test_failure_display_names_phase() {
        let failure = Failure::new(FailurePhase::Teardown, "connection already closed");
        assert_eq!(
            failure.to_string(),
            "teardown failed: connection already closed"
        );
    }
}
