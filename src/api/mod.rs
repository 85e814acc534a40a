mod auth;
mod error;
mod reports;
mod users;

use axum::{Json, Router, http::StatusCode, routing::get};
use std::sync::Arc;

use crate::db::Database;
use crate::rate_limit::RateLimitConfig;
use crate::session::SessionIssuer;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    issuer: SessionIssuer,
    secure_cookies: bool,
    rate_limits: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        issuer,
        secure_cookies,
    };

    let users_state = users::UsersState { db: db.clone() };

    let reports_state = reports::ReportsState { db };

    Router::new()
        .nest("/auth", auth::router(auth_state, rate_limits))
        .nest("/users", users::router(users_state))
        .nest("/reports", reports::router(reports_state))
        .route("/health", get(health))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
