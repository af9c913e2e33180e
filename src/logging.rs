//! Structured logging setup for the `wallet-ledger` binary.
//!
//! Events go to stderr so the wallet CSV on stdout stays clean.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive when neither `RUST_LOG` nor `--log-level` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the filter from an explicit level, then `RUST_LOG`, then the default
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    }
}

/// Install the global subscriber
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init(level: Option<&str>) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true);

    let installed = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer)
        .try_init();

    if installed.is_ok() {
        tracing::debug!("logging initialized");
    }
}
