//! Unit tests for reference_queue components

mod queue_test;

/// Initialises logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
