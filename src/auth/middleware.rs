//! # Authentication Middleware
//!
//! Credential parsing runs once per request, before routing to a handler. The
//! outcome is stored in request extensions as an [`Authentication`] value; the
//! middleware itself never rejects, so public routes keep working for anonymous
//! callers. Handlers state what they need through extractors:
//!
//! - [`ActiveSession`] requires a verified principal with an active or pending session
//! - [`InternalOperator`] additionally requires one of the internal roles
//!
//! Because these are `FromRequestParts` extractors they run before any body
//! extractor, so a missing credential is reported as 401 before the body is even
//! looked at, and no downstream call happens.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::providers::IdentityVerifier;
use crate::core::error::GatewayError;
use crate::core::types::{Principal, Role};

/// Cookie the identity provider's frontend SDK stores the session token in
pub const SESSION_COOKIE: &str = "__session";

/// Result of credential verification for the current request
#[derive(Debug, Clone)]
pub enum Authentication {
    Verified(Principal),
    Anonymous { reason: String },
}

/// Extract the session token from the `Authorization` header or the session cookie
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Axum middleware that verifies the credential and records the outcome
pub async fn authenticate(
    State(verifier): State<Arc<dyn IdentityVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authentication = match extract_credential(request.headers()) {
        Some(token) => match verifier.verify(&token).await {
            Ok(principal) => {
                debug!(user_id = %principal.id, status = ?principal.session_status, "Session verified");
                Authentication::Verified(principal)
            }
            Err(err) => {
                debug!(error = %err, "Session verification failed");
                Authentication::Anonymous {
                    reason: err.to_string(),
                }
            }
        },
        None => Authentication::Anonymous {
            reason: "missing credential".to_string(),
        },
    };

    request.extensions_mut().insert(authentication);
    next.run(request).await
}

/// A principal whose session may read and write user data
#[derive(Debug, Clone)]
pub struct ActiveSession(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for ActiveSession
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication>() {
            Some(Authentication::Verified(principal)) if principal.session_status.is_usable() => {
                Ok(ActiveSession(principal.clone()))
            }
            Some(Authentication::Verified(principal)) => Err(GatewayError::unauthenticated(format!(
                "session for {} is {:?}",
                principal.id, principal.session_status
            ))),
            Some(Authentication::Anonymous { reason }) => {
                Err(GatewayError::unauthenticated(reason.clone()))
            }
            // Route mounted without the middleware: fail closed
            None => Err(GatewayError::unauthenticated("no authentication context")),
        }
    }
}

/// An active session holding one of [`Role::INTERNAL`]
#[derive(Debug, Clone)]
pub struct InternalOperator(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for InternalOperator
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ActiveSession(principal) = ActiveSession::from_request_parts(parts, state).await?;
        authorize(&principal, &Role::INTERNAL)?;
        Ok(InternalOperator(principal))
    }
}

/// Require the principal to hold one of `roles`
pub fn authorize(principal: &Principal, roles: &[Role]) -> Result<(), GatewayError> {
    if principal.has_any_role(roles) {
        Ok(())
    } else {
        Err(GatewayError::forbidden(format!(
            "user {} with role {:?} is not allowed",
            principal.id, principal.role
        )))
    }
}
