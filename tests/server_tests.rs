//! # Server Lifecycle Tests
//!
//! Real TCP listener, real HTTP client, graceful shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use common::*;
use symptom_gateway::{GatewayConfig, GatewayServer, GatewayState};

fn state() -> GatewayState {
    GatewayState::new(
        Arc::new(StaticIdentityVerifier::default()),
        Arc::new(MockAnalytics::default()),
        Arc::new(MockMl::default()),
        Arc::new(CountingStore::default()),
    )
}

#[tokio::test]
async fn test_serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = GatewayServer::new(&GatewayConfig::default(), state(), None).unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_listener(listener, async move {
        let _ = shutdown_rx.await;
    }));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "symptom-gateway");

    let response = client
        .get(format!("http://{}/api/reports", addr))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_metrics_route_only_when_enabled() {
    let harness = Harness::new();
    let response = harness.server.get("/metrics").await;
    assert_eq!(response.status_code(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let harness = Harness::new();

    let response = harness
        .server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static("req-123"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "req-123");
}

#[test]
fn test_bind_address_from_config() {
    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 3999;

    let server = GatewayServer::new(&config, state(), None).unwrap();
    assert_eq!(server.bind_addr().to_string(), "127.0.0.1:3999");
}
