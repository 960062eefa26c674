//! gRPC client for the ML (outbreak clustering) service.

use async_trait::async_trait;

use super::messages::{FetchLatestDataRequest, FetchLatestDataResponse};
use super::MlService;
use crate::core::error::GatewayResult;
use crate::protocols::RpcChannel;

#[derive(Clone)]
pub struct MlServiceClient {
    channel: RpcChannel,
}

impl MlServiceClient {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl MlService for MlServiceClient {
    async fn fetch_latest_data(
        &self,
        request: FetchLatestDataRequest,
    ) -> GatewayResult<FetchLatestDataResponse> {
        self.channel.unary("FetchLatestData", request).await
    }
}
