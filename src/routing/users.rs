use axum::Json;

use crate::auth::ActiveSession;
use crate::core::types::Principal;

/// `GET /api/users/@me`: the principal resolved from the caller's session
pub async fn current_user(ActiveSession(principal): ActiveSession) -> Json<Principal> {
    Json(principal)
}
