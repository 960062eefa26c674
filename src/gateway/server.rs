//! # HTTP Server Module
//!
//! Binds the listen socket and serves the router built by
//! [`build_router`](crate::routing::build_router). The server runs until the
//! shutdown future resolves; in-flight requests are then allowed to finish.
//!
//! ## Rust Concepts Used
//!
//! - `tokio::net::TcpListener` for accepting incoming connections
//! - `axum::serve` with graceful shutdown driven by any `Future`

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::core::config::GatewayConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::gateway::state::GatewayState;
use crate::routing::build_router;

/// The gateway's HTTP server
pub struct GatewayServer {
    bind_addr: SocketAddr,
    app: Router,
}

impl GatewayServer {
    pub fn new(config: &GatewayConfig, state: GatewayState, metrics: Option<PrometheusHandle>) -> GatewayResult<Self> {
        Ok(Self {
            bind_addr: config.bind_addr()?,
            app: build_router(state, metrics, config.server.versioned_routes),
        })
    }

    /// Configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Bind the configured address and serve until `shutdown` resolves
    #[instrument(skip(self, shutdown), fields(bind_addr = %self.bind_addr))]
    pub async fn serve<F>(self, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr).await.map_err(|e| {
            GatewayError::internal(format!("Failed to bind gateway server to {}: {}", self.bind_addr, e))
        })?;

        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener; tests bind port 0 and pass it in
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!("Gateway HTTP server listening on {}", local_addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::internal(format!("Gateway server error: {}", e)))?;

        info!("Gateway HTTP server stopped");
        Ok(())
    }
}
