//! Service banner and health probe.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub users: &'static str,
    pub expenses: &'static str,
    pub approvals: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub tables_created: bool,
}

/// Describe the service and where its resources live
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Expense Management System API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            users: "/api/users",
            expenses: "/api/expenses",
            approvals: "/api/approvals",
        },
    })
}

/// Report whether the database answers queries and holds the schema
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthStatus>) {
    let tables: Result<i64, sqlx::Error> = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
         AND name IN ('users', 'expenses', 'audit_logs')",
    )
    .fetch_one(&state.db)
    .await;

    match tables {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "healthy",
                database: "connected",
                tables_created: count == 3,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed to reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "unhealthy",
                    database: "unreachable",
                    tables_created: false,
                }),
            )
        }
    }
}
