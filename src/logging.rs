//! Logging setup
//!
//! `RUST_LOG` takes precedence; otherwise this crate logs at the given level.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. Calling it twice is harmless.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,gateway_cache_core={level},gateway_cache={level}"))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
