//! # Metrics
//!
//! Counters for the two kinds of downstream work the gateway does: RPC calls and
//! store operations. Recording is a no-op until [`install_prometheus`] has installed
//! the global recorder, which only `main` does, so tests never contend for it.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::error::{GatewayError, GatewayResult};

pub const RPC_CALLS_TOTAL: &str = "gateway_rpc_calls_total";
pub const STORE_OPERATIONS_TOTAL: &str = "gateway_store_operations_total";

/// Install the Prometheus recorder; the handle renders the `/metrics` body
pub fn install_prometheus() -> GatewayResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| GatewayError::config(format!("Failed to install metrics recorder: {}", e)))?;

    ::metrics::describe_counter!(RPC_CALLS_TOTAL, "Unary gRPC calls by service, method and outcome");
    ::metrics::describe_counter!(STORE_OPERATIONS_TOTAL, "Report store operations by outcome");

    Ok(handle)
}

pub fn record_rpc_call(service: &str, method: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        RPC_CALLS_TOTAL,
        "service" => service.to_string(),
        "method" => method,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_store_operation(operation: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        STORE_OPERATIONS_TOTAL,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
