//! # Routing
//!
//! One handler per external endpoint. Each handler validates its input, calls at
//! most one remote procedure and optionally the report store, and maps the outcome
//! to a JSON response. Errors leave through [`GatewayError`](crate::GatewayError)'s
//! `IntoResponse` impl so every failure has the same `{"message"}` shape.

pub mod extract;
pub mod health;
pub mod heatmap;
pub mod internal;
pub mod reports;
pub mod router;
pub mod users;

pub use router::build_router;
