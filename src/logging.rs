//! # Structured Logging
//!
//! Console logging for the batch runner. Chunk commits, step transitions and
//! per-record delivery failures are all traced; `RUST_LOG` controls the
//! filter as usual.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber once per process.
///
/// Safe to call from every entry point; later calls are no-ops. Tests that
/// want log output can call this from their setup without fighting over the
/// global subscriber.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,passbatch_core=debug"));

        // try_init: another subscriber may already be installed in tests.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .try_init();
    });
}
