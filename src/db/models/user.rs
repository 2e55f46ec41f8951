//! User directory models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::audit::delete_expense_audit_logs_for_owner;
use crate::db::error::{StoreError, StoreResult};

/// Roles a user can hold. Stored and serialized as "Employee", "Manager", "Admin".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum UserRole {
    /// Submits expenses
    #[default]
    Employee,
    /// Reviews pending expenses
    Manager,
    /// Reviews expenses and sees the whole ledger
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Employee => "Employee",
            UserRole::Manager => "Manager",
            UserRole::Admin => "Admin",
        }
    }

    /// Check if the role can see every expense in the ledger
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Check if the role can list and decide on pending expenses
    pub fn can_review_expenses(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

/// List every user in insertion order
pub async fn list_users(pool: &SqlitePool) -> StoreResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT id, name, role FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn find_user(pool: &SqlitePool, id: i64) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT id, name, role FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create_user(pool: &SqlitePool, name: &str, role: UserRole) -> StoreResult<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, role) VALUES (?, ?) RETURNING id, name, role",
    )
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, "Created user");
    Ok(user)
}

/// Matches unless the row is the only Admin left
const KEEPS_AN_ADMIN: &str =
    "(role != 'Admin' OR (SELECT COUNT(*) FROM users WHERE role = 'Admin') > 1)";

/// Overwrite a user's role. Any role may become any other role, except that the
/// last Admin cannot be demoted.
pub async fn update_user_role(pool: &SqlitePool, id: i64, role: UserRole) -> StoreResult<User> {
    let sql = format!(
        "UPDATE users SET role = ? WHERE id = ? AND (? = 'Admin' OR {}) \
         RETURNING id, name, role",
        KEEPS_AN_ADMIN
    );
    let updated = sqlx::query_as::<_, User>(&sql)
        .bind(role)
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

    let Some(user) = updated else {
        return Err(match find_user(pool, id).await? {
            Some(_) => StoreError::LastAdmin,
            None => StoreError::NotFound("User"),
        });
    };

    tracing::info!(user_id = user.id, role = %user.role, "Updated user role");
    Ok(user)
}

/// Delete a user. Their expenses go with them through the foreign key cascade, and the
/// audit trail of those expenses is removed in the same transaction. The last Admin
/// cannot be deleted.
pub async fn delete_user(pool: &SqlitePool, id: i64) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    let audit_rows = delete_expense_audit_logs_for_owner(&mut tx, id).await?;

    let sql = format!("DELETE FROM users WHERE id = ? AND {}", KEEPS_AN_ADMIN);
    let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;

    if result.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        // Dropping the transaction rolls back the audit cleanup
        return Err(match exists {
            Some(_) => StoreError::LastAdmin,
            None => StoreError::NotFound("User"),
        });
    }

    tx.commit().await?;

    tracing::info!(user_id = id, audit_rows = audit_rows, "Deleted user");
    Ok(())
}

/// Create an admin user when the directory is empty so a fresh install has a caller
pub async fn ensure_admin_user(pool: &SqlitePool, name: &str) -> StoreResult<Option<User>> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if count.0 > 0 {
        return Ok(None);
    }

    let user = create_user(pool, name, UserRole::Admin).await?;
    tracing::info!(user_id = user.id, "Created bootstrap admin user");
    Ok(Some(user))
}
