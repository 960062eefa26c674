//! Shared test doubles and a router harness for the HTTP-level tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue};
use axum_test::TestServer;

use symptom_gateway::auth::IdentityVerifier;
use symptom_gateway::core::types::{Principal, Role, SessionStatus, SymptomReport};
use symptom_gateway::services::messages::{
    CalculateReadingRequest, CalculateReadingResponse, FetchHeatmapRequest, FetchHeatmapResponse,
    FetchLatestDataRequest, FetchLatestDataResponse, HeatmapPoint, HeatmapPointGroup,
    InferSymptomsAndCauseRequest, InferSymptomsAndCauseResponse, Location, Reading, Timestamp,
};
use symptom_gateway::services::{AnalyticsService, MlService};
use symptom_gateway::storage::{MemoryReportStore, ReportStore};
use symptom_gateway::{build_router, GatewayError, GatewayResult, GatewayState};

pub const USER_TOKEN: &str = "user-token";
pub const OTHER_USER_TOKEN: &str = "other-user-token";
pub const PENDING_TOKEN: &str = "pending-token";
pub const INACTIVE_TOKEN: &str = "inactive-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const SYSTEM_TOKEN: &str = "system-token";
pub const DEVELOPER_TOKEN: &str = "developer-token";

/// Resolves a fixed set of opaque tokens
pub struct StaticIdentityVerifier {
    principals: HashMap<String, Principal>,
}

impl Default for StaticIdentityVerifier {
    fn default() -> Self {
        let principals = [
            (USER_TOKEN, Principal::new("user_1", None, SessionStatus::Active)),
            (OTHER_USER_TOKEN, Principal::new("user_2", None, SessionStatus::Active)),
            (PENDING_TOKEN, Principal::new("user_3", None, SessionStatus::Pending)),
            (INACTIVE_TOKEN, Principal::new("user_4", None, SessionStatus::None)),
            (ADMIN_TOKEN, Principal::new("admin_1", Some(Role::Admin), SessionStatus::Active)),
            (SYSTEM_TOKEN, Principal::new("system_1", Some(Role::System), SessionStatus::Active)),
            (DEVELOPER_TOKEN, Principal::new("dev_1", Some(Role::Developer), SessionStatus::Pending)),
        ]
        .into_iter()
        .map(|(token, principal)| (token.to_string(), principal))
        .collect();

        Self { principals }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, credential: &str) -> GatewayResult<Principal> {
        self.principals
            .get(credential)
            .cloned()
            .ok_or_else(|| GatewayError::unauthenticated("unknown test token"))
    }
}

fn unavailable(service: &str) -> GatewayError {
    GatewayError::remote(service, "Bad Request", "Unavailable: connection refused")
}

/// Analytics double that counts calls and records the last request per method
#[derive(Default)]
pub struct MockAnalytics {
    pub infer_calls: AtomicUsize,
    pub heatmap_calls: AtomicUsize,
    pub reading_calls: AtomicUsize,
    pub last_inference: Mutex<Option<InferSymptomsAndCauseRequest>>,
    pub last_heatmap: Mutex<Option<FetchHeatmapRequest>>,
    pub last_reading: Mutex<Option<CalculateReadingRequest>>,
    /// Fail every call at the transport level
    pub unavailable: AtomicBool,
    /// Report `success = false` from inference
    pub inference_unsuccessful: AtomicBool,
    /// Application error embedded in heatmap and reading responses
    pub embedded_error: Mutex<Option<String>>,
}

impl MockAnalytics {
    pub fn total_calls(&self) -> usize {
        self.infer_calls.load(Ordering::SeqCst)
            + self.heatmap_calls.load(Ordering::SeqCst)
            + self.reading_calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    pub fn set_embedded_error(&self, error: &str) {
        *self.embedded_error.lock().unwrap() = Some(error.to_string());
    }

    fn check_available(&self) -> GatewayResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable("AnalyticsService"))
        } else {
            Ok(())
        }
    }

    /// Naive keyword inference, enough to give tests deterministic output
    fn infer(text: &str) -> InferSymptomsAndCauseResponse {
        let text = text.to_lowercase();
        let mut symptoms = HashMap::new();
        if text.contains("headache") {
            symptoms.insert("headache".to_string(), if text.contains("mild") { 1 } else { 2 });
        }
        if text.contains("sore throat") {
            symptoms.insert("sore throat".to_string(), 1);
        }
        if text.contains("fever") {
            symptoms.insert("fever".to_string(), 3);
        }

        InferSymptomsAndCauseResponse {
            symptoms,
            cause: "common cold".to_string(),
            success: true,
        }
    }
}

#[async_trait]
impl AnalyticsService for MockAnalytics {
    async fn infer_symptoms_and_cause(
        &self,
        request: InferSymptomsAndCauseRequest,
    ) -> GatewayResult<InferSymptomsAndCauseResponse> {
        self.infer_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_inference.lock().unwrap() = Some(request.clone());
        self.check_available()?;

        let mut response = Self::infer(&request.text);
        if self.inference_unsuccessful.load(Ordering::SeqCst) {
            response.success = false;
        }
        Ok(response)
    }

    async fn fetch_heatmap(&self, request: FetchHeatmapRequest) -> GatewayResult<FetchHeatmapResponse> {
        self.heatmap_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_heatmap.lock().unwrap() = Some(request.clone());
        self.check_available()?;

        Ok(FetchHeatmapResponse {
            heatmap_points: vec![HeatmapPointGroup {
                points: vec![HeatmapPoint {
                    location: Some(Location {
                        lat: 40.7128,
                        lon: -74.006,
                    }),
                    intensity: 0.8,
                    radius: 25.0,
                }],
            }],
            error: self.embedded_error.lock().unwrap().clone(),
        })
    }

    async fn calculate_reading(
        &self,
        request: CalculateReadingRequest,
    ) -> GatewayResult<CalculateReadingResponse> {
        self.reading_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_reading.lock().unwrap() = Some(request.clone());
        self.check_available()?;

        if let Some(error) = self.embedded_error.lock().unwrap().clone() {
            return Ok(CalculateReadingResponse {
                success: false,
                error: Some(error),
                reading: None,
            });
        }

        Ok(CalculateReadingResponse {
            success: true,
            error: None,
            reading: Some(Reading {
                created_at: Some(Timestamp {
                    seconds: 1_714_564_800,
                    nanos: 0,
                }),
                timespan: request.timespan,
                similarity: request.similarity,
                heatmap_points: Vec::new(),
            }),
        })
    }
}

pub const LATEST_GEOJSON: &str =
    r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[-74.0,40.7]},"properties":{"cluster":1}}]}"#;

#[derive(Default)]
pub struct MockMl {
    pub calls: AtomicUsize,
    pub unavailable: AtomicBool,
}

#[async_trait]
impl MlService for MockMl {
    async fn fetch_latest_data(
        &self,
        _request: FetchLatestDataRequest,
    ) -> GatewayResult<FetchLatestDataResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable("MLService"));
        }

        Ok(FetchLatestDataResponse {
            time_window_start: Some(Timestamp {
                seconds: 1_714_521_600,
                nanos: 0,
            }),
            time_window_end: Some(Timestamp {
                seconds: 1_714_608_000,
                nanos: 0,
            }),
            geojson: Some(LATEST_GEOJSON.to_string()),
        })
    }
}

/// In-memory store that counts calls and can be switched to fail
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryReportStore,
    pub select_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl CountingStore {
    pub fn total_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst) + self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, value: bool) {
        self.failing.store(value, Ordering::SeqCst);
    }

    pub fn stored(&self) -> usize {
        self.inner.len()
    }

    fn check(&self) -> GatewayResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GatewayError::store("Database request failed", "simulated outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReportStore for CountingStore {
    async fn select_reports_by_user(&self, user_id: &str) -> GatewayResult<Vec<SymptomReport>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.select_reports_by_user(user_id).await
    }

    async fn insert_report(&self, report: &SymptomReport) -> GatewayResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.insert_report(report).await
    }
}

/// Router wired to test doubles, plus handles to inspect them
pub struct Harness {
    pub server: TestServer,
    pub analytics: Arc<MockAnalytics>,
    pub ml: Arc<MockMl>,
    pub store: Arc<CountingStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_identity(Arc::new(StaticIdentityVerifier::default()))
    }

    pub fn with_identity(identity: Arc<dyn IdentityVerifier>) -> Self {
        let analytics = Arc::new(MockAnalytics::default());
        let ml = Arc::new(MockMl::default());
        let store = Arc::new(CountingStore::default());

        let state = GatewayState::new(identity, analytics.clone(), ml.clone(), store.clone());
        let server = TestServer::new(build_router(state, None, true)).unwrap();

        Self {
            server,
            analytics,
            ml,
            store,
        }
    }

    /// Remote and store calls made so far
    pub fn downstream_calls(&self) -> usize {
        self.analytics.total_calls() + self.ml.calls.load(Ordering::SeqCst) + self.store.total_calls()
    }
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}
