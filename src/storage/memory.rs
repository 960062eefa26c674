//! In-memory report store used for local development and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::ReportStore;
use crate::core::error::GatewayResult;
use crate::core::types::SymptomReport;

/// Reports kept per user in a concurrent map; lost on restart
#[derive(Default)]
pub struct MemoryReportStore {
    reports: DashMap<String, Vec<SymptomReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored reports across all users
    pub fn len(&self) -> usize {
        self.reports.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn select_reports_by_user(&self, user_id: &str) -> GatewayResult<Vec<SymptomReport>> {
        Ok(self
            .reports
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn insert_report(&self, report: &SymptomReport) -> GatewayResult<()> {
        let mut stored = report.clone();
        if stored.id.is_none() {
            stored.id = Some(Uuid::new_v4().to_string());
        }

        self.reports
            .entry(stored.user_id.clone())
            .or_default()
            .push(stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn report(user_id: &str, cause: &str) -> SymptomReport {
        SymptomReport {
            id: None,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            symptoms: HashMap::from([("cough".to_string(), 1)]),
            cause: cause.to_string(),
            notes: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_reports_are_scoped_to_user() {
        let store = MemoryReportStore::new();
        assert!(store.is_empty());
        store.insert_report(&report("alice", "cold")).await.unwrap();
        store.insert_report(&report("bob", "flu")).await.unwrap();

        let alice = store.select_reports_by_user("alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].cause, "cold");
        assert!(store.select_reports_by_user("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_inserts_create_distinct_rows() {
        let store = MemoryReportStore::new();
        let row = report("alice", "cold");
        store.insert_report(&row).await.unwrap();
        store.insert_report(&row).await.unwrap();

        let rows = store.select_reports_by_user("alice").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].id, rows[1].id);
        assert_eq!(store.len(), 2);
    }
}
