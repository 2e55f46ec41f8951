//! User directory endpoints.
//!
//! Anyone may list users and register Employees. Granting any other role,
//! changing roles and deleting users need an Admin caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{self, CreateUserRequest, UpdateUserRoleRequest, User, UserRole};
use crate::AppState;

use super::auth::Caller;
use super::error::ApiError;
use super::validation::validate_user_name;

/// List every user
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    let users = db::list_users(&state.db).await?;
    Ok(Json(users))
}

/// Create a user. Role defaults to Employee; other roles need an Admin caller.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    if req.role != UserRole::Employee {
        caller.require_admin()?;
    }
    validate_user_name(&req.name).map_err(|e| ApiError::validation_field("name", e))?;

    let user = db::create_user(&state.db, req.name.trim(), req.role).await?;
    tracing::info!(user_id = user.id, created_by = caller.id(), "User registered");

    Ok(Json(user))
}

/// Overwrite a user's role (admin only)
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    caller: Caller,
    Json(req): Json<UpdateUserRoleRequest>,
) -> Result<Json<User>, ApiError> {
    caller.require_admin()?;

    let user = db::update_user_role(&state.db, id, req.role).await?;
    Ok(Json(user))
}

/// Delete a user and, through the cascade, all of their expenses (admin only).
/// Callers cannot delete themselves.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    caller: Caller,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;

    if id == caller.id() {
        return Err(ApiError::bad_request("You cannot delete your own user"));
    }

    db::delete_user(&state.db, id).await?;
    tracing::info!(user_id = id, deleted_by = caller.id(), "User removed");

    Ok(StatusCode::NO_CONTENT)
}
