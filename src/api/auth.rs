//! Caller identity.
//!
//! Each request runs on behalf of a `Caller`: the user named by the `X-User-Id`
//! header, or the configured default caller when the header is absent and the
//! header is not required. The user
//! must exist; their stored role drives the permission checks in the handlers.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::db::{find_user, User, UserRole};
use crate::AppState;

use super::error::ApiError;

/// Header carrying the caller's user id
pub const CALLER_HEADER: &str = "x-user-id";

/// The user a request executes for
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
}

impl Caller {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    /// Require the Admin role
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role().is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "Access denied. Admin privileges required.",
            ))
        }
    }

    /// Require the Manager or Admin role
    pub fn require_reviewer(&self) -> Result<(), ApiError> {
        if self.role().can_review_expenses() {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "Access denied. Manager or Admin privileges required.",
            ))
        }
    }
}

/// Resolve the caller's user id from the request headers
fn caller_id_from_headers(headers: &HeaderMap, default: Option<i64>) -> Result<i64, ApiError> {
    match headers.get(CALLER_HEADER) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::unauthorized("Invalid X-User-Id header")),
        None => default.ok_or_else(|| ApiError::unauthorized("Missing X-User-Id header")),
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = caller_id_from_headers(&parts.headers, state.config.auth.fallback_caller_id())?;

        let user = find_user(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::unauthorized(format!("Unknown caller: user {}", id)))?;

        tracing::debug!(user_id = user.id, role = %user.role, "Resolved caller");
        Ok(Caller { user })
    }
}
