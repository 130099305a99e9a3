//! Caller identity
//!
//! The upstream authentication layer forwards the authenticated user's id
//! in the `X-User-Id` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use sortie_core::domain::execution::PrincipalId;

use crate::api::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated principal of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub PrincipalId);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;

        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<PrincipalId>().ok())
            .map(Principal)
            .ok_or_else(|| ApiError::Unauthorized("invalid X-User-Id header".to_string()))
    }
}
