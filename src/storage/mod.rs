//! # Report Store
//!
//! Thin persistence adapter for symptom reports. The hosted database owns the
//! schema; this crate only selects a user's rows and inserts new ones. There are no
//! transactions and no version column, so concurrent writers simply append.

pub mod memory;
pub mod supabase;

pub use memory::MemoryReportStore;
pub use supabase::SupabaseReportStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::GatewayResult;
use crate::core::types::{Location, SymptomReport};

/// Persistence operations the route handlers need
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// All reports owned by `user_id`
    async fn select_reports_by_user(&self, user_id: &str) -> GatewayResult<Vec<SymptomReport>>;

    /// Persist one report as a new row
    async fn insert_report(&self, report: &SymptomReport) -> GatewayResult<()>;
}

/// Row layout of the `reports` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Database-assigned key; integer or uuid depending on the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub symptoms: HashMap<String, i32>,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl From<&SymptomReport> for ReportRow {
    fn from(report: &SymptomReport) -> Self {
        Self {
            id: report.id.clone().map(serde_json::Value::String),
            user_id: report.user_id.clone(),
            timestamp: report.timestamp,
            symptoms: report.symptoms.clone(),
            cause: report.cause.clone(),
            notes: report.notes.clone(),
            lat: report.location.map(|l| l.lat),
            lon: report.location.map(|l| l.lon),
        }
    }
}

impl From<ReportRow> for SymptomReport {
    fn from(row: ReportRow) -> Self {
        let id = row.id.map(|id| match id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

        // A half-filled position is not a location
        let location = match (row.lat, row.lon) {
            (Some(lat), Some(lon)) => Some(Location { lat, lon }),
            _ => None,
        };

        Self {
            id,
            user_id: row.user_id,
            timestamp: row.timestamp,
            symptoms: row.symptoms,
            cause: row.cause,
            notes: row.notes,
            location,
        }
    }
}
