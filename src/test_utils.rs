//! Internal test helpers: logging initialization and assertion macros.
//!
//! Enabled by the `test-internals` feature. Tests call
//! [`init_test_logging`] once, mark phases with [`test_phase!`](crate::test_phase),
//! assert with [`assert_with_log!`](crate::assert_with_log) so failures land
//! in the structured log, and close with
//! [`test_complete!`](crate::test_complete).

use std::sync::Once;

/// Initializes the tracing subscriber for tests. Idempotent.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    });
}

/// Marks the beginning of a test phase in the structured log.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(target: "cordon::test", phase = $name, "test phase");
    };
}

/// Marks a test as complete in the structured log.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(target: "cordon::test", test = $name, "test complete");
    };
}

/// Asserts a condition, logging expected and actual values on failure
/// before panicking.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $what:expr, $expected:expr, $actual:expr) => {
        if $cond {
            tracing::trace!(target: "cordon::test", check = $what, "check passed");
        } else {
            tracing::error!(
                target: "cordon::test",
                check = $what,
                expected = ?$expected,
                actual = ?$actual,
                "check failed"
            );
            panic!(
                "check failed: {} (expected {:?}, actual {:?})",
                $what, $expected, $actual
            );
        }
    };
}
