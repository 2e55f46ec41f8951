//! Expense ledger models and queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqlitePool};

use crate::db::error::StoreResult;

/// Approval lifecycle of an expense. Pending is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "Pending",
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Rejected => "Rejected",
        }
    }

    pub fn as_lowercase(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) const EXPENSE_COLUMNS: &str =
    "id, amount, currency, date, description, status, owner_id";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub date: DateTime<Utc>,
    pub description: String,
    pub status: ExpenseStatus,
    pub owner_id: i64,
}

// Amounts are stored as TEXT so SQLite never rounds them through a float.
impl<'r> FromRow<'r, SqliteRow> for Expense {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_amount: String = row.try_get("amount")?;
        let amount = raw_amount
            .parse::<Decimal>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "amount".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            amount,
            currency: row.try_get("currency")?,
            date: row.try_get("date")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            owner_id: row.try_get("owner_id")?,
        })
    }
}

/// Body of an expense submission. Status and owner are never taken from the client.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    pub description: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Parse an RFC 3339 timestamp, a naive date-time (taken as UTC) or a bare date
/// (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date or timestamp: {}", raw)))
}

/// Insert a new expense owned by `owner_id`. The status always starts as Pending.
pub async fn create_expense(
    pool: &SqlitePool,
    owner_id: i64,
    req: &CreateExpenseRequest,
) -> StoreResult<Expense> {
    let sql = format!(
        "INSERT INTO expenses (amount, currency, date, description, status, owner_id) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
        EXPENSE_COLUMNS
    );

    let expense = sqlx::query_as::<_, Expense>(&sql)
        .bind(req.amount.to_string())
        .bind(&req.currency)
        .bind(req.date)
        .bind(&req.description)
        .bind(ExpenseStatus::Pending)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    tracing::info!(
        expense_id = expense.id,
        owner_id = owner_id,
        amount = %expense.amount,
        currency = %expense.currency,
        "Created expense"
    );

    Ok(expense)
}

pub async fn find_expense(pool: &SqlitePool, id: i64) -> StoreResult<Option<Expense>> {
    let sql = format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS);
    let expense = sqlx::query_as::<_, Expense>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(expense)
}

/// Expenses owned by a single user
pub async fn list_expenses_by_owner(pool: &SqlitePool, owner_id: i64) -> StoreResult<Vec<Expense>> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE owner_id = ? ORDER BY id",
        EXPENSE_COLUMNS
    );
    let expenses = sqlx::query_as::<_, Expense>(&sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    Ok(expenses)
}

/// Every expense in the ledger, unfiltered
pub async fn list_expenses(pool: &SqlitePool) -> StoreResult<Vec<Expense>> {
    let sql = format!("SELECT {} FROM expenses ORDER BY id", EXPENSE_COLUMNS);
    let expenses = sqlx::query_as::<_, Expense>(&sql).fetch_all(pool).await?;
    Ok(expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{create_user, delete_user, UserRole};
    use rust_decimal_macros::dec;

    fn taxi() -> CreateExpenseRequest {
        serde_json::from_value(serde_json::json!({
            "amount": 42.50,
            "date": "2024-01-01",
            "description": "Taxi"
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(midnight));

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-01").is_none());
    }

    #[test]
    fn test_create_request_defaults() {
        let req = taxi();
        assert_eq!(req.amount, dec!(42.50));
        assert_eq!(req.currency, "USD");
        assert_eq!(req.description, "Taxi");
    }

    #[test]
    fn test_create_request_requires_amount_and_date() {
        let missing_amount = serde_json::json!({"date": "2024-01-01", "description": "Taxi"});
        assert!(serde_json::from_value::<CreateExpenseRequest>(missing_amount).is_err());

        let missing_date = serde_json::json!({"amount": 3, "description": "Taxi"});
        assert!(serde_json::from_value::<CreateExpenseRequest>(missing_date).is_err());

        let bad_date = serde_json::json!({"amount": 3, "date": "soon", "description": "Taxi"});
        assert!(serde_json::from_value::<CreateExpenseRequest>(bad_date).is_err());
    }

    #[test]
    fn test_status_serializes_as_literal_names() {
        assert_eq!(serde_json::to_string(&ExpenseStatus::Pending).unwrap(), "\"Pending\"");
        assert_eq!(ExpenseStatus::Rejected.as_lowercase(), "rejected");
    }

    #[tokio::test]
    async fn test_create_expense_is_pending_and_owned_by_caller() {
        let pool = test_pool().await;
        let owner = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();

        let expense = create_expense(&pool, owner.id, &taxi()).await.unwrap();

        assert_eq!(expense.status, ExpenseStatus::Pending);
        assert_eq!(expense.owner_id, owner.id);
        assert_eq!(expense.amount, dec!(42.50));
        assert_eq!(expense.currency, "USD");
        assert_eq!(expense.date, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let stored = find_expense(&pool, expense.id).await.unwrap().unwrap();
        assert_eq!(stored, expense);
    }

    #[tokio::test]
    async fn test_amount_keeps_precision() {
        let pool = test_pool().await;
        let owner = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();

        let mut req = taxi();
        req.amount = dec!(1234567.8901);
        let expense = create_expense(&pool, owner.id, &req).await.unwrap();

        let stored = find_expense(&pool, expense.id).await.unwrap().unwrap();
        assert_eq!(stored.amount, dec!(1234567.8901));
    }

    #[tokio::test]
    async fn test_unknown_owner_is_rejected() {
        let pool = test_pool().await;
        let err = create_expense(&pool, 99, &taxi()).await.unwrap_err();
        assert!(matches!(err, crate::db::StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_list_by_owner_never_returns_other_users_expenses() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();
        let bob = create_user(&pool, "Bob", UserRole::Employee).await.unwrap();

        create_expense(&pool, ada.id, &taxi()).await.unwrap();
        create_expense(&pool, bob.id, &taxi()).await.unwrap();
        create_expense(&pool, ada.id, &taxi()).await.unwrap();

        let mine = list_expenses_by_owner(&pool, ada.id).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|e| e.owner_id == ada.id));

        assert_eq!(list_expenses(&pool).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_expenses() {
        let pool = test_pool().await;
        let ada = create_user(&pool, "Ada", UserRole::Employee).await.unwrap();
        let bob = create_user(&pool, "Bob", UserRole::Employee).await.unwrap();
        create_expense(&pool, ada.id, &taxi()).await.unwrap();
        create_expense(&pool, ada.id, &taxi()).await.unwrap();
        let kept = create_expense(&pool, bob.id, &taxi()).await.unwrap();

        delete_user(&pool, ada.id).await.unwrap();

        let remaining = list_expenses(&pool).await.unwrap();
        assert_eq!(remaining, vec![kept]);
        assert!(list_expenses_by_owner(&pool, ada.id).await.unwrap().is_empty());
    }
}
