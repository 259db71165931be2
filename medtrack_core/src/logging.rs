//! Logging setup shared by the MedTrack binaries.
//!
//! Log output goes to stderr so it never mixes with command output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at the default `warn` level
pub fn init() {
    init_with_level("warn")
}

/// Initialize logging with a default level (`debug`, `info`, `warn`, `error`)
///
/// `RUST_LOG` still takes precedence when set.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize logging for unit tests (captured per test)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
