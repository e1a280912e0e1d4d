//! Tracing/logging setup shared by the binary and tests.

/// Initialize process-wide tracing, reading the output format from
/// `CURATOR_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formats).
pub mod tracing;
