//! # Gateway State
//!
//! Every collaborator a handler needs is constructed once at startup and held here
//! behind a trait object. Handlers receive it through axum's `State` extractor, so
//! tests can swap any dependency for a double without touching global state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{IdentityVerifier, JwtSessionVerifier};
use crate::core::config::GatewayConfig;
use crate::core::error::GatewayResult;
use crate::protocols::RpcChannel;
use crate::services::{AnalyticsService, AnalyticsServiceClient, MlService, MlServiceClient};
use crate::storage::{MemoryReportStore, ReportStore, SupabaseReportStore};

/// Long-lived dependencies shared by all requests
#[derive(Clone)]
pub struct GatewayState {
    pub identity: Arc<dyn IdentityVerifier>,
    pub analytics: Arc<dyn AnalyticsService>,
    pub ml: Arc<dyn MlService>,
    pub store: Arc<dyn ReportStore>,
}

impl GatewayState {
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        analytics: Arc<dyn AnalyticsService>,
        ml: Arc<dyn MlService>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            identity,
            analytics,
            ml,
            store,
        }
    }

    /// Build the production state: JWT verification, one lazy gRPC channel per
    /// remote service, and the hosted database when it is configured.
    ///
    /// Must run inside the tokio runtime because channels are created there.
    pub async fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let identity = JwtSessionVerifier::from_config(&config.identity).await?;

        let analytics = AnalyticsServiceClient::new(RpcChannel::connect_lazy(&config.services.analytics)?);
        let ml = MlServiceClient::new(RpcChannel::connect_lazy(&config.services.ml)?);
        info!(
            analytics = %config.services.analytics.address,
            ml = %config.services.ml.address,
            "Remote service channels ready"
        );

        let store: Arc<dyn ReportStore> = match SupabaseReportStore::from_config(&config.database)? {
            Some(store) => {
                info!(table = %config.database.reports_table, "Using hosted database for reports");
                Arc::new(store)
            }
            None => {
                warn!("No database URL configured; reports are kept in memory and lost on restart");
                Arc::new(MemoryReportStore::new())
            }
        };

        Ok(Self::new(Arc::new(identity), Arc::new(analytics), Arc::new(ml), store))
    }
}
