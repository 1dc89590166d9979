//! Tracing setup for processes embedding the job intake crates.
//!
//! The intake crates only emit `trace`-level spans and events; nothing shows up
//! unless the embedding process installs a subscriber through this crate (or its own).
//!
//! Broker clients and worker binaries call [`init`] once at startup. Tests call
//! [`init_for_tests`] instead, which writes through the test harness.

/// Initialize process-wide JSON tracing, filtered by `RUST_LOG` (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::init_for_tests;
