//! Log initialisation based on `tracing` and `tracing-subscriber`.
//!
//! The level filter is read from `RUST_LOG` (default: `info`), e.g.
//! `RUST_LOG=order_packer=debug` to see per-customer packing steps.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Text output unless JSON is configured.
pub fn init(config: &LogConfig) {
    if config.json() {
        fmt()
            .json()
            .with_env_filter(env_filter())
            .with_target(true)
            .with_current_span(false)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter())
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .init();
    }
}

/// Subscriber for tests; safe to call more than once.
#[cfg(test)]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
