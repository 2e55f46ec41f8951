mod approvals;
pub mod auth;
pub mod error;
mod expenses;
mod system;
mod users;
mod validation;

use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", delete(users::delete_user))
        .route("/users/:id/role", patch(users::update_user_role))
        // Expenses
        .route("/expenses", post(expenses::create_expense))
        .route("/expenses/mine", get(expenses::list_my_expenses))
        .route("/expenses/all", get(expenses::list_all_expenses))
        // Approvals
        .route("/approvals/pending", get(approvals::list_pending))
        .route("/approvals/:id", post(approvals::decide))
        .route("/approvals/:id/history", get(approvals::decision_history));

    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(system::service_info))
        .route("/health", get(system::health_check))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured front-end origins. `*` reflects any origin; origins that are
/// not valid header values are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}
