//! Logging setup with tracing-subscriber
//!
//! `RUST_LOG` selects the filter (default `info`), e.g.
//! `RUST_LOG=chipquote=debug` to see every resolved condition and feature
//! time. Output goes to stderr so reports on stdout stay clean.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Verbose logging captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
