//! Process-wide logging setup.

/// Initialize structured logging for the process.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filter and output format).
pub mod tracing;
