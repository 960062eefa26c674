//! Request extractors with gateway-shaped rejections.

use axum::extract::FromRequest;

use crate::core::error::GatewayError;

/// `axum::Json` whose rejection is a 400 `{"message"}` instead of axum's plain text
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(GatewayError))]
pub struct ApiJson<T>(pub T);
