//! # Internal Endpoints
//!
//! `POST /api/internal/readings` triggers an analysis job over a time window. Only
//! callers holding one of the internal roles may use it.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::InternalOperator;
use crate::core::error::{GatewayError, GatewayResult};
use crate::gateway::state::GatewayState;
use crate::routing::extract::ApiJson;
use crate::services::messages::{CalculateReadingRequest, Reading, ReadingTimespan};

/// Timespan given by name (any case) or by its numeric enum value
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimespanInput {
    Name(String),
    Value(i32),
}

impl TryFrom<TimespanInput> for ReadingTimespan {
    type Error = GatewayError;

    fn try_from(input: TimespanInput) -> Result<Self, Self::Error> {
        let parsed = match input {
            TimespanInput::Name(name) => name.parse::<ReadingTimespan>().ok(),
            TimespanInput::Value(value) => ReadingTimespan::try_from(value).ok(),
        };
        parsed.ok_or_else(|| GatewayError::validation("timespan", "Invalid timespan"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadingJobRequest {
    pub timespan: TimespanInput,
    #[serde(default)]
    pub similarity: Option<OneOrMany>,
}

#[derive(Debug, Serialize)]
pub struct ReadingJobResponse {
    pub reading: Option<Reading>,
}

#[instrument(skip_all, fields(user_id = %operator.id))]
pub async fn trigger_reading(
    State(state): State<GatewayState>,
    InternalOperator(operator): InternalOperator,
    ApiJson(body): ApiJson<ReadingJobRequest>,
) -> GatewayResult<Json<ReadingJobResponse>> {
    let timespan = ReadingTimespan::try_from(body.timespan)?;
    let similarity: Vec<String> = body
        .similarity
        .map(Vec::from)
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    let response = state
        .analytics
        .calculate_reading(CalculateReadingRequest {
            timespan: timespan as i32,
            similarity,
        })
        .await?;

    if let Some(error) = response.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(GatewayError::remote(
            "AnalyticsService",
            error,
            "CalculateReading returned an error",
        ));
    }

    info!(timespan = timespan.as_str_name(), "Reading calculated");
    Ok(Json(ReadingJobResponse {
        reading: response.reading,
    }))
}
