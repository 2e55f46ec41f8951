//! Expense ledger endpoints.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::{self, CreateExpenseRequest, Expense};
use crate::AppState;

use super::auth::Caller;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{normalize_currency, validate_description};

/// Submit an expense for the caller. It always starts Pending.
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(mut req): Json<CreateExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    match normalize_currency(&req.currency) {
        Ok(currency) => req.currency = currency,
        Err(e) => {
            errors.add("currency", e);
        }
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    errors.finish()?;

    let expense = db::create_expense(&state.db, caller.id(), &req).await?;
    Ok(Json(expense))
}

/// Expenses owned by the caller
pub async fn list_my_expenses(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let expenses = db::list_expenses_by_owner(&state.db, caller.id()).await?;
    Ok(Json(expenses))
}

/// Every expense in the ledger (admin only)
pub async fn list_all_expenses(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Expense>>, ApiError> {
    caller.require_admin()?;

    let expenses = db::list_expenses(&state.db).await?;
    Ok(Json(expenses))
}
