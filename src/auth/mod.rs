//! # Authentication and Authorization
//!
//! Session verification (`providers`) and the request pipeline glue that attaches
//! the verified principal to each request (`middleware`).

pub mod middleware;
pub mod providers;

pub use middleware::{authenticate, ActiveSession, Authentication, InternalOperator};
pub use providers::{IdentityVerifier, JwtSessionVerifier, SessionClaims};
