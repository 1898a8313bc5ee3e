//! Structured diagnostics for the pipeline itself, using **tracing**.
//!
//! The core only emits `tracing` events (skipped records, uncaptured
//! fields). Binaries call [`init_structured_logging`] once to send them
//! to stderr as JSON, leaving stdout for rendered events.

use tracing::{info, warn};

/// Initializes the global tracing subscriber.
///
/// Call once at startup. Output is JSON on stderr.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=eventfmt_core=debug`)
pub fn init_structured_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Report the outcome of processing one input file.
pub fn log_file_summary(path: &std::path::Path, events: usize, shown: usize) {
    info!(path = %path.display(), events, shown, "processed log file");
}

/// Report an input that could not be read at all.
pub fn log_unreadable(path: &std::path::Path, detail: &str) {
    warn!(path = %path.display(), detail = %detail, "unreadable log file");
}
