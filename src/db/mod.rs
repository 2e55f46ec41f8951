mod error;
mod models;

pub use error::{StoreError, StoreResult};
pub use models::*;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Name of the database file inside the data directory
pub const DB_FILE_NAME: &str = "claimdesk.db";

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open (creating if needed) the database file in `data_dir` and bring the schema up to date
pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join(DB_FILE_NAME);
    let db_url = format!("sqlite:{}", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = connect(&db_url, 5).await?;
    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Build a pool with foreign keys enforced on every connection
pub async fn connect(db_url: &str, max_connections: u32) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("Invalid database URL: {}", db_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db_url))?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Users and expenses
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Audit log for approval decisions
    let has_audit_logs_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='audit_logs'",
    )
    .fetch_optional(pool)
    .await?;
    if has_audit_logs_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_audit_logs.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

/// Migrated in-memory database. A single connection keeps every query on the same database.
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(
            SqliteConnectOptions::from_str("sqlite::memory:")
                .unwrap()
                .foreign_keys(true),
        )
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
