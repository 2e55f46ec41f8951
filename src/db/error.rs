//! Errors raised by the storage operations.

use thiserror::Error;

use super::models::ExpenseStatus;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Expense is already {}", .0.as_lowercase())]
    InvalidState(ExpenseStatus),

    #[error("Cannot remove the last Admin")]
    LastAdmin,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
