//! PostgREST-backed report store for the hosted database.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use super::{ReportRow, ReportStore};
use crate::core::config::DatabaseConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::SymptomReport;
use crate::observability::metrics;

/// Report store speaking the hosted database's REST dialect.
///
/// The `reqwest::Client` keeps a connection pool, so one instance is shared by
/// every request for the life of the process.
#[derive(Clone)]
pub struct SupabaseReportStore {
    client: Client,
    /// Always ends with `/` so relative joins keep the full path
    base_url: Url,
    key: String,
    table: String,
}

impl SupabaseReportStore {
    pub fn new(base_url: &str, key: impl Into<String>, table: impl Into<String>) -> GatewayResult<Self> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');

        let base_url = Url::parse(&normalized)
            .map_err(|e| GatewayError::config(format!("Invalid database URL {}: {}", base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            key: key.into(),
            table: table.into(),
        })
    }

    /// Build the store from configuration; `None` when no database URL is set
    pub fn from_config(config: &DatabaseConfig) -> GatewayResult<Option<Self>> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };
        let key = config
            .key
            .clone()
            .ok_or_else(|| GatewayError::config("SUPABASE_KEY is required when SUPABASE_URL is set"))?;

        Self::new(url, key, config.reports_table.clone()).map(Some)
    }

    fn table_url(&self) -> GatewayResult<Url> {
        self.base_url
            .join(&format!("rest/v1/{}", self.table))
            .map_err(|e| GatewayError::internal(format!("Invalid table path: {}", e)))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    /// Turn a non-2xx response into a store error carrying the response body
    async fn check(response: Response, operation: &'static str) -> GatewayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(operation, status = status.as_u16(), body = %body, "Database rejected request");
        Err(GatewayError::store(
            "Database request failed",
            format!("{} returned {}: {}", operation, status, body),
        ))
    }

    async fn fetch_rows(&self, user_id: &str) -> GatewayResult<Vec<ReportRow>> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", user_id));

        let response = self.authorized(self.client.get(url)).send().await?;
        let rows = Self::check(response, "select").await?.json::<Vec<ReportRow>>().await?;
        Ok(rows)
    }

    async fn post_row(&self, row: &ReportRow) -> GatewayResult<()> {
        let url = self.table_url()?;
        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(response, "insert").await?;
        Ok(())
    }
}

#[async_trait]
impl ReportStore for SupabaseReportStore {
    async fn select_reports_by_user(&self, user_id: &str) -> GatewayResult<Vec<SymptomReport>> {
        match self.fetch_rows(user_id).await {
            Ok(rows) => {
                debug!(user_id, count = rows.len(), "Fetched reports");
                metrics::record_store_operation("select", "ok");
                Ok(rows.into_iter().map(SymptomReport::from).collect())
            }
            Err(err) => {
                metrics::record_store_operation("select", "error");
                Err(err)
            }
        }
    }

    async fn insert_report(&self, report: &SymptomReport) -> GatewayResult<()> {
        let result = self.post_row(&ReportRow::from(report)).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::record_store_operation("insert", outcome);
        result
    }
}
