//! Test logging setup

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]. Safe to call from
/// every test; only the first call installs a subscriber.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
