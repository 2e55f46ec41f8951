//! Audit log models for tracking approval decisions.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::error::StoreResult;

/// Audit log entry for a decision taken on a resource
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub action: String,
    pub resource_type: String,
    pub resource_id: i64,
    pub user_id: Option<i64>,
    /// JSON document with action-specific data (e.g. decision comments)
    pub details: Option<String>,
    pub created_at: String,
}

/// Audit action types
pub mod actions {
    pub const EXPENSE_APPROVE: &str = "expense.approve";
    pub const EXPENSE_REJECT: &str = "expense.reject";
}

/// Audited resource types
pub mod resource_types {
    pub const EXPENSE: &str = "expense";
}

/// Record an audit event on `conn`, usually the transaction that made the change
pub async fn log_audit(
    conn: &mut SqliteConnection,
    action: &str,
    resource_type: &str,
    resource_id: i64,
    user_id: Option<i64>,
    details: Option<serde_json::Value>,
) -> StoreResult<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());

    sqlx::query(
        r#"
        INSERT INTO audit_logs (action, resource_type, resource_id, user_id, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(action)
    .bind(resource_type)
    .bind(resource_id)
    .bind(user_id)
    .bind(&details_json)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        action = action,
        resource_type = resource_type,
        resource_id = resource_id,
        user_id = user_id,
        "Audit log recorded"
    );

    Ok(())
}

/// Drop the audit trail of every expense owned by `owner_id`
pub async fn delete_expense_audit_logs_for_owner(
    conn: &mut SqliteConnection,
    owner_id: i64,
) -> StoreResult<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM audit_logs
        WHERE resource_type = ?
          AND resource_id IN (SELECT id FROM expenses WHERE owner_id = ?)
        "#,
    )
    .bind(resource_types::EXPENSE)
    .bind(owner_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Audit entries for one resource, newest first
pub async fn list_audit_logs_for(
    pool: &SqlitePool,
    resource_type: &str,
    resource_id: i64,
) -> StoreResult<Vec<AuditLog>> {
    let logs = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT * FROM audit_logs
        WHERE resource_type = ? AND resource_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(resource_type)
    .bind(resource_id)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}
