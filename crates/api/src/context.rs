//! Caller identity extraction.
//!
//! Authentication happens upstream; this layer trusts the `x-user-id`
//! and `x-admin` headers the proxy injects and turns them into the
//! [`RequestContext`] every core operation takes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{RequestContext, UserId};
use uuid::Uuid;

use crate::error::ApiError;

/// Extracts the authenticated caller from request headers.
pub struct Caller(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing x-user-id header".to_string()))?;
        let user_id = Uuid::parse_str(raw)
            .map(UserId::from_uuid)
            .map_err(|e| ApiError::Unauthorized(format!("invalid x-user-id header: {e}")))?;

        let is_admin = parts
            .headers
            .get("x-admin")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "true" || v == "1");

        Ok(Caller(if is_admin {
            RequestContext::admin(user_id)
        } else {
            RequestContext::customer(user_id)
        }))
    }
}
