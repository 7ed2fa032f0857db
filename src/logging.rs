//! # Structured Logging
//!
//! Environment-aware `tracing` initialization for binaries and tests that
//! embed the core. Libraries only emit events; installing a subscriber is
//! the host's call, which is why this is opt-in.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize a console subscriber once, driven by `RUST_LOG` with an
/// `info`-level fallback. Safe to call repeatedly; later calls are no-ops,
/// and an already-installed global subscriber is left alone.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("orchestrator_core=info"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init();
    });
}
