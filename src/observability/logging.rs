//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. JSON output is the default for
//! deployed environments; the pretty format is meant for local development.
//! `RUST_LOG` takes precedence over the configured level.

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::config::{LogConfig, LogFormat};

/// Build the filter from `RUST_LOG`, falling back to the configured directive
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber
pub fn init_logging(config: &LogConfig) {
    let filter = env_filter(config);

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
    };

    // Don't fail if a subscriber is already installed (e.g. by a test harness)
    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return;
    }

    info!(format = ?config.format, "Structured logging initialized");
}
