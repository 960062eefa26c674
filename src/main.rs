//! # Symptom Gateway - Main Entry Point
//!
//! Startup sequence:
//! 1. Load configuration from `GATEWAY_CONFIG_PATH` when set, otherwise from the
//!    environment alone
//! 2. Initialize logging and, when enabled, the Prometheus recorder
//! 3. Build the gateway state (identity verifier, gRPC channels, report store)
//! 4. Serve until SIGINT or SIGTERM, letting in-flight requests finish
//!
//! Any startup failure is logged and the process exits with status 1.

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use symptom_gateway::observability::{init_logging, install_prometheus};
use symptom_gateway::{GatewayConfig, GatewayServer, GatewayState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be initialized if configuration failed
        eprintln!("Failed to start gateway: {:#}", e);
        error!("Failed to start gateway: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = load_config().await?;
    init_logging(&config.observability.logging);

    info!("Starting symptom gateway v{}", env!("CARGO_PKG_VERSION"));

    let metrics = if config.observability.metrics_enabled {
        Some(install_prometheus().context("installing metrics recorder")?)
    } else {
        None
    };

    let state = GatewayState::from_config(&config)
        .await
        .context("building gateway state")?;
    let server = GatewayServer::new(&config, state, metrics).context("creating server")?;
    info!(bind_addr = %server.bind_addr(), "Gateway configured");

    server
        .serve(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Symptom gateway shutdown complete");
    Ok(())
}

async fn load_config() -> anyhow::Result<GatewayConfig> {
    match std::env::var("GATEWAY_CONFIG_PATH") {
        Ok(path) => GatewayConfig::load_from_file(&path)
            .await
            .with_context(|| format!("loading configuration from {}", path)),
        Err(_) => GatewayConfig::from_env().context("loading configuration from environment"),
    }
}

/// Resolves on the first SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install SIGINT handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
