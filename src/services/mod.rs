//! # Remote Procedure Clients
//!
//! Typed stubs for the remote services the gateway forwards to. Handlers depend on
//! the [`AnalyticsService`] and [`MlService`] traits; the gRPC implementations are
//! constructed once at startup around a shared [`RpcChannel`](crate::protocols::RpcChannel)
//! and injected through the gateway state.

use async_trait::async_trait;

use crate::core::error::GatewayResult;

pub mod analytics;
pub mod messages;
pub mod ml;

pub use analytics::AnalyticsServiceClient;
pub use ml::MlServiceClient;

use messages::{
    CalculateReadingRequest, CalculateReadingResponse, FetchHeatmapRequest, FetchHeatmapResponse,
    FetchLatestDataRequest, FetchLatestDataResponse, InferSymptomsAndCauseRequest,
    InferSymptomsAndCauseResponse,
};

/// Symptom inference, heatmaps and readings
#[async_trait]
pub trait AnalyticsService: Send + Sync {
    async fn infer_symptoms_and_cause(
        &self,
        request: InferSymptomsAndCauseRequest,
    ) -> GatewayResult<InferSymptomsAndCauseResponse>;

    async fn fetch_heatmap(&self, request: FetchHeatmapRequest) -> GatewayResult<FetchHeatmapResponse>;

    async fn calculate_reading(
        &self,
        request: CalculateReadingRequest,
    ) -> GatewayResult<CalculateReadingResponse>;
}

/// Outbreak clustering output
#[async_trait]
pub trait MlService: Send + Sync {
    async fn fetch_latest_data(
        &self,
        request: FetchLatestDataRequest,
    ) -> GatewayResult<FetchLatestDataResponse>;
}
