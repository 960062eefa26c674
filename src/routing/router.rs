//! # Router Module
//!
//! Assembles the axum [`Router`]: the `/api` endpoints (mirrored under `/v1`), the
//! health probe and the optional Prometheus scrape endpoint, wrapped in the
//! authentication middleware and the request-id and tracing layers.
//!
//! ## Layer order
//!
//! `ServiceBuilder` applies layers top to bottom, outermost first. The request id is
//! assigned before the trace span opens so every log line of a request carries it,
//! and it is copied to the response on the way out.

use axum::{
    body::Body,
    extract::OriginalUri,
    http::{Method, Request},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::auth::authenticate;
use crate::core::error::GatewayError;
use crate::gateway::state::GatewayState;
use crate::routing::{health, heatmap, internal, reports, users};

/// Endpoints shared by the `/api` and `/v1` prefixes
fn api_routes() -> Router<GatewayState> {
    Router::new()
        .route(
            "/reports",
            get(reports::list_reports)
                .post(reports::create_report)
                .fallback(method_not_allowed),
        )
        .route("/heatmap", get(heatmap::get_heatmap).fallback(method_not_allowed))
        .route(
            "/internal/readings",
            post(internal::trigger_reading).fallback(method_not_allowed),
        )
        .route("/users/@me", get(users::current_user).fallback(method_not_allowed))
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> GatewayError {
    GatewayError::not_found(uri.path())
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> GatewayError {
    GatewayError::method_not_allowed(method.as_str(), uri.path())
}

/// Build the complete application router
pub fn build_router(state: GatewayState, metrics: Option<PrometheusHandle>, versioned: bool) -> Router {
    let mut app = Router::new()
        .nest("/api", api_routes())
        .route("/health", get(health::health_check).fallback(method_not_allowed));

    if versioned {
        app = app.nest("/v1", api_routes());
    }

    if let Some(handle) = metrics {
        app = app.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    app.fallback(route_not_found)
        .layer(from_fn_with_state(state.identity.clone(), authenticate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default();
                    info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
