//! # Symptom Gateway Library
//!
//! The HTTP entry point of the symptom-tracking backend. The gateway verifies the
//! caller's session, forwards work to the analytics and ML services over gRPC, and
//! persists symptom reports in the hosted database.
//!
//! ## Request flow
//!
//! ```text
//! HTTP request
//!   -> request id + trace span            (tower-http)
//!   -> credential verification            (auth::middleware)
//!   -> route handler                      (routing::*)
//!        -> session / role check          (extractors)
//!        -> input validation
//!        -> gRPC call                     (services::*, protocols::grpc)
//!        -> report store                  (storage::*)
//!   -> JSON body, or {"message"} on error (core::error)
//! ```
//!
//! Every collaborator is constructed once in [`GatewayState::from_config`] and
//! injected into handlers, so tests replace any of them with a double.

/// Error types, configuration and shared data structures
pub mod core;

/// Session token verification and the extractors handlers use to demand a session
pub mod auth;

/// gRPC channel management
pub mod protocols;

/// Typed clients for the analytics and ML services
pub mod services;

/// Report persistence
pub mod storage;

/// Server bootstrap and dependency container
pub mod gateway;

/// HTTP endpoints
pub mod routing;

/// Logging and metrics
pub mod observability;

pub use core::config::GatewayConfig;
pub use core::error::{GatewayError, GatewayResult};
pub use gateway::{GatewayServer, GatewayState};
pub use routing::build_router;
