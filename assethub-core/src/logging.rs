//! Diagnostic logging infrastructure
//!
//! Structured diagnostics go to stderr via `tracing`; the auditable
//! per-session log lives in the session log database (see
//! [`crate::session::log`]).

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the logging system
///
/// The filter comes from `RUST_LOG` when set, otherwise from the
/// configured log level.
pub fn init(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!(level = %config.level, "Logging initialized");
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
