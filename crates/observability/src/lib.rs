//! Tracing and logging setup shared by binaries and tests.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Human-readable debug output captured by the test harness.
pub fn init_test() {
    tracing::init_test();
}

/// Subscriber configuration (filters, formatting).
pub mod tracing;
