//! # Core Types
//!
//! Data structures shared by the identity adapter, the store adapter and the route
//! handlers: the per-request [`Principal`] and the persisted [`SymptomReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Roles carried in the session token's `metadata.role` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Admin,
    Developer,
}

impl Role {
    /// Roles allowed to trigger internal analysis jobs
    pub const INTERNAL: [Role; 3] = [Role::System, Role::Admin, Role::Developer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Admin => "admin",
            Role::Developer => "developer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "admin" => Ok(Role::Admin),
            "developer" => Ok(Role::Developer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Status of the session the credential belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    /// Valid but not fully activated (e.g. outstanding onboarding tasks)
    Pending,
    None,
}

impl SessionStatus {
    /// Map the token's `sts` claim. Tokens without the claim predate session
    /// tasks and are treated as active.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            None | Some("active") => SessionStatus::Active,
            Some("pending") => SessionStatus::Pending,
            Some(_) => SessionStatus::None,
        }
    }

    /// Whether the session may read or write user data
    pub fn is_usable(&self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Pending)
    }
}

/// The authenticated identity resolved for a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub role: Option<Role>,
    pub session_status: SessionStatus,
}

impl Principal {
    pub fn new<S: Into<String>>(id: S, role: Option<Role>, session_status: SessionStatus) -> Self {
        Self {
            id: id.into(),
            role,
            session_status,
        }
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role.map_or(false, |role| roles.contains(&role))
    }
}

/// Geographic position attached to a report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A user's symptom report as returned by the API.
///
/// Created once after a successful inference call and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    /// Symptom name -> severity
    pub symptoms: HashMap<String, i32>,
    pub cause: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}
