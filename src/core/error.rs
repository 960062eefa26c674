//! # Error Handling Module
//!
//! This module defines every error the gateway can produce while serving a request
//! and maps each one to the HTTP status and JSON body returned to the mobile client.
//!
//! ## Rust Error Handling Concepts
//!
//! Rust doesn't use exceptions. Fallible operations return `Result<T, E>` and the
//! `?` operator propagates the error to the caller:
//! ```rust,ignore
//! async fn create_report(state: &GatewayState, text: String) -> GatewayResult<Inference> {
//!     let inference = state.analytics.infer_symptoms_and_cause(text).await?;
//!     state.store.insert_report(&report).await?;
//!     Ok(inference)
//! }
//! ```
//!
//! Every handler returns `GatewayResult<T>`, and because `GatewayError` implements
//! axum's `IntoResponse`, an `Err` is turned into a `{"message": ...}` body with the
//! matching status code at the handler boundary. Nothing is retried and nothing
//! crashes the process.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error taxonomy for the gateway
///
/// `message` fields are what the client sees; `reason` fields carry the
/// diagnostic detail that only goes to the logs.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// No credential, or a credential that failed verification
    #[error("Authentication failed: {reason}")]
    Unauthenticated { reason: String },

    /// Authenticated, but lacking the role the endpoint requires
    #[error("Authorization failed: {reason}")]
    Forbidden { reason: String },

    /// Malformed query string or request body
    #[error("Request validation failed: {field} - {message}")]
    Validation { field: String, message: String },

    /// No route for the requested path
    #[error("No route for {path}")]
    NotFound { path: String },

    /// The path exists but does not accept this method
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// RPC transport failure or application error reported by a remote service
    #[error("Remote call to {service} failed: {reason}")]
    RemoteCall {
        service: String,
        message: String,
        reason: String,
    },

    /// Database operation failure
    #[error("Store operation failed: {reason}")]
    Store { message: String, reason: String },

    /// Invalid or missing configuration at startup
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected failures that don't fit any other category
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create an authentication error with a diagnostic reason
    pub fn unauthenticated<S: Into<String>>(reason: S) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    /// Create an authorization error with a diagnostic reason
    pub fn forbidden<S: Into<String>>(reason: S) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create a validation error for a specific input field
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn method_not_allowed<M: Into<String>, P: Into<String>>(method: M, path: P) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Create a remote call error; `reason` is logged, `message` is returned
    pub fn remote<S: Into<String>, M: Into<String>, R: Into<String>>(
        service: S,
        message: M,
        reason: R,
    ) -> Self {
        Self::RemoteCall {
            service: service.into(),
            message: message.into(),
            reason: reason.into(),
        }
    }

    /// Create a store error; `reason` is logged, `message` is returned
    pub fn store<M: Into<String>, R: Into<String>>(message: M, reason: R) -> Self {
        Self::Store {
            message: message.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Replace the client-facing message of a remote or store error.
    ///
    /// Lower layers don't know which endpoint they are serving, so handlers
    /// use this to attach the endpoint-specific wording.
    pub fn with_message<S: Into<String>>(self, new_message: S) -> Self {
        match self {
            Self::RemoteCall {
                service, reason, ..
            } => Self::RemoteCall {
                service,
                message: new_message.into(),
                reason,
            },
            Self::Store { reason, .. } => Self::Store {
                message: new_message.into(),
                reason,
            },
            other => other,
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::RemoteCall { .. } => StatusCode::BAD_REQUEST,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The human-readable message sent in the response body
    pub fn client_message(&self) -> String {
        match self {
            Self::Unauthenticated { .. } => "Unauthorized".to_string(),
            Self::Forbidden { .. } => "Forbidden".to_string(),
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound { .. } => "Not Found".to_string(),
            Self::MethodNotAllowed { .. } => "Method Not Allowed".to_string(),
            Self::RemoteCall { message, .. } => message.clone(),
            Self::Store { message, .. } => message.clone(),
            Self::Configuration { .. } | Self::Internal { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    /// Get a string representation of the error type for logs and metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Forbidden { .. } => "forbidden",
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::RemoteCall { .. } => "remote_call_failure",
            Self::Store { .. } => "store_failure",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation("body", rejection.body_text())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::store("Database request failed", err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for GatewayError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::unauthenticated(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config(format!("Failed to parse config: {}", err))
    }
}

/// Convert errors into the `{"message": ...}` body every endpoint uses
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type = self.error_type(), "Request failed");
        } else {
            tracing::warn!(error = %self, error_type = self.error_type(), "Request rejected");
        }

        (status, Json(json!({ "message": self.client_message() }))).into_response()
    }
}
