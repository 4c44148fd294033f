//! Subscriber initialization.
//!
//! `RUST_LOG` overrides the default filter in [`init`]. The lot engine logs
//! rejected identifiers and unallocated surplus at `warn`, committed records
//! at `info`, and per-submission detail at `debug`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";
const TEST_FILTER: &str = "debug";

fn filter_from_env(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env(DEFAULT_FILTER))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Initialize tracing for tests; output goes through the test writer so
/// `cargo test` only shows it for failing tests.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env(TEST_FILTER))
        .with_test_writer()
        .with_line_number(true)
        .try_init();
}
