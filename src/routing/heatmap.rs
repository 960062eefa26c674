//! # Heatmap Endpoint
//!
//! `GET /api/heatmap` is public. With a `timespan` it relays the analytics
//! service's aggregated points for that window, optionally filtered by one or more
//! `similarity` values. Without one it returns the ML service's latest outbreak
//! clustering as GeoJSON.
//!
//! The query string is parsed by hand because `similarity` may repeat, and a
//! repeated `timespan` must be rejected rather than silently collapsed.

use axum::{
    extract::{RawQuery, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::error::{GatewayError, GatewayResult};
use crate::gateway::state::GatewayState;
use crate::services::messages::{
    FetchHeatmapRequest, FetchHeatmapResponse, FetchLatestDataRequest, FetchLatestDataResponse,
    ReadingTimespan,
};

/// Parsed `GET /api/heatmap` query
#[derive(Debug, Default, PartialEq)]
pub struct HeatmapQuery {
    pub timespan: Option<ReadingTimespan>,
    pub similarity: Vec<String>,
}

/// Latest clustering output from the ML service
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestHeatmap {
    pub time_window_start: Option<DateTime<Utc>>,
    pub time_window_end: Option<DateTime<Utc>>,
    pub geojson: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HeatmapResponse {
    Points(FetchHeatmapResponse),
    Latest(LatestHeatmap),
}

fn invalid_timespan() -> GatewayError {
    GatewayError::validation("timespan", "Invalid timespan")
}

/// Parse the raw query string.
///
/// Accepts `similarity=a&similarity=b` and `similarity[]=a`; empty similarity
/// values are dropped. `timespan` may appear at most once.
pub fn parse_heatmap_query(raw: Option<&str>) -> GatewayResult<HeatmapQuery> {
    let mut timespans = Vec::new();
    let mut similarity = Vec::new();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "timespan" => timespans.push(value.into_owned()),
            "similarity" | "similarity[]" if !value.is_empty() => similarity.push(value.into_owned()),
            _ => {}
        }
    }

    let timespan = match timespans.as_slice() {
        [] => None,
        [value] => Some(value.parse::<ReadingTimespan>().map_err(|_| invalid_timespan())?),
        _ => return Err(invalid_timespan()),
    };

    Ok(HeatmapQuery {
        timespan,
        similarity,
    })
}

#[instrument(skip_all)]
pub async fn get_heatmap(
    State(state): State<GatewayState>,
    RawQuery(query): RawQuery,
) -> GatewayResult<Json<HeatmapResponse>> {
    let query = parse_heatmap_query(query.as_deref())?;

    let response = match query.timespan {
        Some(timespan) => HeatmapResponse::Points(fetch_points(&state, timespan, query.similarity).await?),
        None => HeatmapResponse::Latest(fetch_latest(&state).await?),
    };

    Ok(Json(response))
}

async fn fetch_points(
    state: &GatewayState,
    timespan: ReadingTimespan,
    similarity: Vec<String>,
) -> GatewayResult<FetchHeatmapResponse> {
    debug!(timespan = timespan.as_str_name(), ?similarity, "Fetching heatmap");

    let response = state
        .analytics
        .fetch_heatmap(FetchHeatmapRequest {
            timespan: timespan as i32,
            similarity,
        })
        .await?;

    match response.error.as_deref().filter(|e| !e.is_empty()) {
        Some(error) => Err(GatewayError::remote(
            "AnalyticsService",
            error,
            "FetchHeatmap returned an error",
        )),
        None => Ok(response),
    }
}

async fn fetch_latest(state: &GatewayState) -> GatewayResult<LatestHeatmap> {
    let response = state.ml.fetch_latest_data(FetchLatestDataRequest {}).await?;
    LatestHeatmap::try_from(response)
}

impl TryFrom<FetchLatestDataResponse> for LatestHeatmap {
    type Error = GatewayError;

    fn try_from(response: FetchLatestDataResponse) -> Result<Self, Self::Error> {
        let geojson = response
            .geojson
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| GatewayError::remote("MLService", "Bad Request", format!("Invalid GeoJSON: {}", e)))?;

        Ok(Self {
            time_window_start: response.time_window_start.and_then(|t| t.to_datetime()),
            time_window_end: response.time_window_end.and_then(|t| t.to_datetime()),
            geojson,
        })
    }
}
