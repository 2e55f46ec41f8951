//! Approval workflow endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{
    self, resource_types, AuditLog, DecisionRequest, DecisionResponse, PendingExpense,
};
use crate::AppState;

use super::auth::Caller;
use super::error::ApiError;

/// Pending expenses with their owner's name (manager or admin)
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<PendingExpense>>, ApiError> {
    caller.require_reviewer()?;

    let pending = db::list_pending_expenses(&state.db).await?;
    Ok(Json(pending))
}

/// Approve or reject a pending expense (manager or admin)
pub async fn decide(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    caller: Caller,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    caller.require_reviewer()?;

    let expense = db::decide_expense(
        &state.db,
        id,
        req.status,
        caller.id(),
        req.comments.as_deref(),
    )
    .await?;

    Ok(Json(DecisionResponse::new(&expense, req.comments)))
}

/// Recorded decisions for one expense, newest first (manager or admin)
pub async fn decision_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    caller: Caller,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    caller.require_reviewer()?;

    if db::find_expense(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found("Expense not found"));
    }

    let logs = db::list_audit_logs_for(&state.db, resource_types::EXPENSE, id).await?;
    Ok(Json(logs))
}
