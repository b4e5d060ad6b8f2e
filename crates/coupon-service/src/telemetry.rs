//! Structured logging setup shared by both binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `tracing-subscriber` formatter driven by `RUST_LOG`, defaulting
/// to `info` when the variable is unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}
