//! # gRPC Channel
//!
//! One [`RpcChannel`] exists per remote service for the life of the process. It
//! wraps a tonic `Channel`, which multiplexes every call over the same HTTP/2
//! connection; cloning the channel is cheap and does not dial again.
//!
//! Calls are unary, typed with prost messages, and made exactly once. There is no
//! retry, backoff or per-call deadline: a failure is reported to the caller as a
//! [`GatewayError::RemoteCall`].

use std::time::Instant;

use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::{debug, warn};

use crate::core::config::RpcServiceConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// Long-lived connection to one remote gRPC service
#[derive(Clone)]
pub struct RpcChannel {
    /// Fully-qualified protobuf service name, e.g. `AnalyticsService`
    service: String,
    inner: Grpc<Channel>,
}

impl RpcChannel {
    /// Create the channel without waiting for the connection.
    ///
    /// The first call establishes the connection; later calls reuse it. Must be
    /// called from within a tokio runtime.
    pub fn connect_lazy(config: &RpcServiceConfig) -> GatewayResult<Self> {
        let mut endpoint = Endpoint::from_shared(config.address.clone()).map_err(|e| {
            GatewayError::config(format!(
                "Invalid address {} for {}: {}",
                config.address, config.service_name, e
            ))
        })?;

        if let Some(timeout) = config.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }

        debug!(service = %config.service_name, address = %config.address, "Created lazy gRPC channel");
        Ok(Self::from_channel(config.service_name.clone(), endpoint.connect_lazy()))
    }

    /// Wrap an existing tonic channel
    pub fn from_channel<S: Into<String>>(service: S, channel: Channel) -> Self {
        Self {
            service: service.into(),
            inner: Grpc::new(channel),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// gRPC request path: `/<package.Service>/<Method>`
    pub fn method_path(&self, method: &str) -> String {
        format!("/{}/{}", self.service, method)
    }

    /// Invoke a unary method with a typed request and decode the typed response
    pub async fn unary<Req, Resp>(&self, method: &'static str, request: Req) -> GatewayResult<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let path = PathAndQuery::try_from(self.method_path(method))
            .map_err(|e| GatewayError::internal(format!("Invalid gRPC path: {}", e)))?;

        let started = Instant::now();
        let result = self.call(path, request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                debug!(service = %self.service, method, elapsed_ms, "gRPC call succeeded");
                metrics::record_rpc_call(&self.service, method, "ok");
                Ok(response)
            }
            Err(status) => {
                warn!(
                    service = %self.service,
                    method,
                    elapsed_ms,
                    code = ?status.code(),
                    grpc_message = status.message(),
                    "gRPC call failed"
                );
                metrics::record_rpc_call(&self.service, method, "error");
                Err(self.status_to_error(method, status))
            }
        }
    }

    async fn call<Req, Resp>(&self, path: PathAndQuery, request: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        // Clones share the underlying connection
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::new(Code::Unavailable, format!("Service was not ready: {}", e)))?;

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc.unary(tonic::Request::new(request), path, codec).await?;
        Ok(response.into_inner())
    }

    fn status_to_error(&self, method: &str, status: Status) -> GatewayError {
        GatewayError::remote(
            self.service.clone(),
            "Bad Request",
            format!("{}: {:?} {}", method, status.code(), status.message()),
        )
    }
}
