//! Shared tracing setup for the assessment pipeline workspace.
//!
//! The orchestration crates instrument with `tracing` (job transitions at
//! `debug`, trigger decisions at `info`, data-quality findings at `warn`);
//! this crate owns the one place a process configures where that goes.

pub use tracing::{LogFormat, ObservabilityConfig, init_with};

/// Initialize process-wide observability with the default configuration.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;
