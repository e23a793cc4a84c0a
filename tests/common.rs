// tests/common.rs
//! Shared test logging setup

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route `tracing` output to the test writer. Respects `RUST_LOG`.
/// Safe to call from every test.
#[allow(dead_code)]
pub fn setup() {
    #[cfg(feature = "logging")]
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/// Same as [`setup`] but at debug level, to see every dropped event
#[allow(dead_code)]
pub fn setup_debug() {
    #[cfg(feature = "logging")]
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::new("vault_sync_core=debug"))
        .try_init()
        .ok();
}
