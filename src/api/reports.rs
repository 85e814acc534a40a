//! Aggregate reporting endpoints.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use crate::db::{AccountStatus, Database};
use crate::jwt;

#[derive(Clone)]
pub struct ReportsState {
    pub db: Database,
}

pub fn router(state: ReportsState) -> Router {
    Router::new()
        .route("/summary", get(summary))
        .with_state(state)
}

#[derive(Serialize)]
struct SummaryResponse {
    active_accounts: i64,
    inactive_accounts: i64,
    active_sessions: i64,
}

async fn summary(State(state): State<ReportsState>) -> Result<Json<SummaryResponse>, ApiError> {
    let users = state.db.users();
    let active_accounts = users
        .count_by_status(AccountStatus::Active)
        .await
        .db_err("Failed to count accounts")?;
    let inactive_accounts = users
        .count_by_status(AccountStatus::Inactive)
        .await
        .db_err("Failed to count accounts")?;

    let now = jwt::now_secs().map_err(|e| {
        tracing::error!(error = %e, "Clock error");
        ApiError::internal("Clock error")
    })? as i64;
    let active_sessions = state
        .db
        .tokens()
        .count_valid(now)
        .await
        .db_err("Failed to count sessions")?;

    Ok(Json(SummaryResponse {
        active_accounts,
        inactive_accounts,
        active_sessions,
    }))
}
