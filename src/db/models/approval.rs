//! Approval workflow: pending queue and the single Pending -> Approved/Rejected transition.

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqlitePool};

use super::audit::{actions, log_audit, resource_types};
use super::expense::{Expense, ExpenseStatus, EXPENSE_COLUMNS};
use crate::db::error::{StoreError, StoreResult};

/// Outcome a reviewer can choose. Pending is not a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn status(&self) -> ExpenseStatus {
        match self {
            Decision::Approved => ExpenseStatus::Approved,
            Decision::Rejected => ExpenseStatus::Rejected,
        }
    }

    fn audit_action(&self) -> &'static str {
        match self {
            Decision::Approved => actions::EXPENSE_APPROVE,
            Decision::Rejected => actions::EXPENSE_REJECT,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: Decision,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub message: String,
    pub expense_id: i64,
    pub new_status: ExpenseStatus,
    pub comments: Option<String>,
}

impl DecisionResponse {
    pub fn new(expense: &Expense, comments: Option<String>) -> Self {
        Self {
            message: format!("Expense {} successfully", expense.status.as_lowercase()),
            expense_id: expense.id,
            new_status: expense.status,
            comments,
        }
    }
}

/// Pending expense joined with its owner's display name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingExpense {
    #[serde(flatten)]
    pub expense: Expense,
    pub owner_name: String,
}

impl<'r> FromRow<'r, SqliteRow> for PendingExpense {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            expense: Expense::from_row(row)?,
            owner_name: row.try_get("owner_name")?,
        })
    }
}

pub async fn list_pending_expenses(pool: &SqlitePool) -> StoreResult<Vec<PendingExpense>> {
    let pending = sqlx::query_as::<_, PendingExpense>(
        r#"
        SELECT e.id, e.amount, e.currency, e.date, e.description, e.status, e.owner_id,
               u.name AS owner_name
        FROM expenses e
        INNER JOIN users u ON e.owner_id = u.id
        WHERE e.status = ?
        ORDER BY e.id
        "#,
    )
    .bind(ExpenseStatus::Pending)
    .fetch_all(pool)
    .await?;

    Ok(pending)
}

/// Move a Pending expense to the decided status and record who decided and why.
///
/// The transition is one conditional UPDATE, so of two concurrent decisions on the
/// same expense exactly one matches a row. When nothing matched, the current row is
/// read back to tell a missing expense from one that was already decided.
pub async fn decide_expense(
    pool: &SqlitePool,
    expense_id: i64,
    decision: Decision,
    decided_by: i64,
    comments: Option<&str>,
) -> StoreResult<Expense> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE expenses SET status = ? WHERE id = ? AND status = ? RETURNING {}",
        EXPENSE_COLUMNS
    );
    let updated = sqlx::query_as::<_, Expense>(&sql)
        .bind(decision.status())
        .bind(expense_id)
        .bind(ExpenseStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(expense) = updated else {
        let current: Option<ExpenseStatus> =
            sqlx::query_scalar("SELECT status FROM expenses WHERE id = ?")
                .bind(expense_id)
                .fetch_optional(&mut *tx)
                .await?;

        return Err(match current {
            Some(status) => StoreError::InvalidState(status),
            None => StoreError::NotFound("Expense"),
        });
    };

    log_audit(
        &mut tx,
        decision.audit_action(),
        resource_types::EXPENSE,
        expense.id,
        Some(decided_by),
        Some(serde_json::json!({
            "previous_status": ExpenseStatus::Pending,
            "new_status": expense.status,
            "comments": comments,
        })),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        expense_id = expense.id,
        decided_by = decided_by,
        status = %expense.status,
        "Expense decided"
    );

    Ok(expense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{
        create_expense, create_user, find_expense, list_audit_logs_for, CreateExpenseRequest,
        UserRole,
    };

    async fn submit(pool: &SqlitePool, owner_id: i64, description: &str) -> Expense {
        let req: CreateExpenseRequest = serde_json::from_value(serde_json::json!({
            "amount": "19.99",
            "currency": "EUR",
            "date": "2024-03-05T10:00:00Z",
            "description": description
        }))
        .unwrap();
        create_expense(pool, owner_id, &req).await.unwrap()
    }

    #[test]
    fn test_decision_rejects_pending() {
        assert!(serde_json::from_str::<DecisionRequest>(r#"{"status": "Pending"}"#).is_err());

        let req: DecisionRequest = serde_json::from_str(r#"{"status": "Rejected"}"#).unwrap();
        assert_eq!(req.status, Decision::Rejected);
        assert!(req.comments.is_none());
    }

    #[tokio::test]
    async fn test_pending_list_includes_owner_name() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();
        let manager = create_user(&pool, "Meg", UserRole::Manager).await.unwrap();
        let lunch = submit(&pool, ada.id, "Lunch").await;
        let hotel = submit(&pool, ada.id, "Hotel").await;

        decide_expense(&pool, hotel.id, Decision::Approved, manager.id, None)
            .await
            .unwrap();

        let pending = list_pending_expenses(&pool).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].expense, lunch);
        assert_eq!(pending[0].owner_name, "Ada");

        let json = serde_json::to_value(&pending[0]).unwrap();
        assert_eq!(json["owner_name"], "Ada");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["id"], lunch.id);
    }

    #[tokio::test]
    async fn test_approve_once_then_invalid_state() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();
        let expense = submit(&pool, ada.id, "Taxi").await;

        let approved = decide_expense(&pool, expense.id, Decision::Approved, ada.id, None)
            .await
            .unwrap();
        assert_eq!(approved.status, ExpenseStatus::Approved);

        let err = decide_expense(&pool, expense.id, Decision::Rejected, ada.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidState(ExpenseStatus::Approved)));
        assert_eq!(err.to_string(), "Expense is already approved");

        let stored = find_expense(&pool, expense.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExpenseStatus::Approved);
    }

    #[tokio::test]
    async fn test_decide_missing_expense() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Admin).await.unwrap();

        let err = decide_expense(&pool, 404, Decision::Rejected, ada.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Expense")));
    }

    #[tokio::test]
    async fn test_decision_comments_are_audited() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();
        let meg = create_user(&pool, "Meg", UserRole::Manager).await.unwrap();
        let expense = submit(&pool, ada.id, "Conference").await;

        decide_expense(&pool, expense.id, Decision::Rejected, meg.id, Some("No receipt"))
            .await
            .unwrap();

        let logs = list_audit_logs_for(&pool, resource_types::EXPENSE, expense.id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, actions::EXPENSE_REJECT);
        assert_eq!(logs[0].user_id, Some(meg.id));

        let details: serde_json::Value =
            serde_json::from_str(logs[0].details.as_deref().unwrap()).unwrap();
        assert_eq!(details["comments"], "No receipt");
        assert_eq!(details["new_status"], "Rejected");
    }

    #[tokio::test]
    async fn test_failed_decision_leaves_no_audit_entry() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Admin).await.unwrap();
        let expense = submit(&pool, ada.id, "Taxi").await;

        decide_expense(&pool, expense.id, Decision::Approved, ada.id, None)
            .await
            .unwrap();
        let _ = decide_expense(&pool, expense.id, Decision::Approved, ada.id, None).await;

        let logs = list_audit_logs_for(&pool, resource_types::EXPENSE, expense.id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn test_decision_response_message() {
        let expense = Expense {
            id: 3,
            amount: rust_decimal::Decimal::ONE,
            currency: "USD".to_string(),
            date: chrono::Utc::now(),
            description: "Taxi".to_string(),
            status: ExpenseStatus::Rejected,
            owner_id: 1,
        };
        let response = DecisionResponse::new(&expense, Some("over budget".to_string()));
        assert_eq!(response.message, "Expense rejected successfully");
        assert_eq!(response.new_status, ExpenseStatus::Rejected);
        assert_eq!(response.comments.as_deref(), Some("over budget"));
    }
}
