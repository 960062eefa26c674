//! # Report Endpoints
//!
//! `GET /api/reports` lists the caller's reports. `POST /api/reports` runs symptom
//! inference over free text and stores the result as a new report. Posting the same
//! text twice stores two reports; nothing deduplicates.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::ActiveSession;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{Location, SymptomReport};
use crate::gateway::state::GatewayState;
use crate::routing::extract::ApiJson;
use crate::services::messages::{InferSymptomsAndCauseRequest, InferSymptomsAndCauseResponse};

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub reports: Vec<SymptomReport>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

#[instrument(skip_all, fields(user_id = %principal.id))]
pub async fn list_reports(
    State(state): State<GatewayState>,
    ActiveSession(principal): ActiveSession,
) -> GatewayResult<Json<ReportsResponse>> {
    let reports = state
        .store
        .select_reports_by_user(&principal.id)
        .await
        .map_err(|e| e.with_message("Failed to fetch reports"))?;

    Ok(Json(ReportsResponse { reports }))
}

#[instrument(skip_all, fields(user_id = %principal.id))]
pub async fn create_report(
    State(state): State<GatewayState>,
    ActiveSession(principal): ActiveSession,
    ApiJson(body): ApiJson<CreateReportRequest>,
) -> GatewayResult<Json<InferSymptomsAndCauseResponse>> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(GatewayError::validation("text", "Text is required"));
    }
    if let Some(location) = body.location.filter(|l| !l.is_valid()) {
        return Err(GatewayError::validation(
            "location",
            format!("Invalid location ({}, {})", location.lat, location.lon),
        ));
    }

    let inference = state
        .analytics
        .infer_symptoms_and_cause(InferSymptomsAndCauseRequest {
            text: text.to_string(),
        })
        .await
        .map_err(|e| e.with_message("Failed to analyze symptoms"))?;

    if !inference.success {
        return Err(GatewayError::remote(
            "AnalyticsService",
            "Failed to analyze symptoms",
            "InferSymptomsAndCause reported success=false",
        ));
    }

    let report = SymptomReport {
        id: None,
        user_id: principal.id.clone(),
        timestamp: Utc::now(),
        symptoms: inference.symptoms.clone(),
        cause: inference.cause.clone(),
        notes: None,
        location: body.location,
    };

    state
        .store
        .insert_report(&report)
        .await
        .map_err(|e| e.with_message("Failed to save report"))?;

    info!(symptoms = report.symptoms.len(), cause = %report.cause, "Report stored");
    Ok(Json(inference))
}
