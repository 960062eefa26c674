//! gRPC client for the analytics service.

use async_trait::async_trait;

use super::messages::{
    CalculateReadingRequest, CalculateReadingResponse, FetchHeatmapRequest, FetchHeatmapResponse,
    InferSymptomsAndCauseRequest, InferSymptomsAndCauseResponse,
};
use super::AnalyticsService;
use crate::core::error::GatewayResult;
use crate::protocols::RpcChannel;

#[derive(Clone)]
pub struct AnalyticsServiceClient {
    channel: RpcChannel,
}

impl AnalyticsServiceClient {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl AnalyticsService for AnalyticsServiceClient {
    async fn infer_symptoms_and_cause(
        &self,
        request: InferSymptomsAndCauseRequest,
    ) -> GatewayResult<InferSymptomsAndCauseResponse> {
        self.channel.unary("InferSymptomsAndCause", request).await
    }

    async fn fetch_heatmap(&self, request: FetchHeatmapRequest) -> GatewayResult<FetchHeatmapResponse> {
        self.channel.unary("FetchHeatmap", request).await
    }

    async fn calculate_reading(
        &self,
        request: CalculateReadingRequest,
    ) -> GatewayResult<CalculateReadingResponse> {
        self.channel.unary("CalculateReading", request).await
    }
}
