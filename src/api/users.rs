//! Account listing for the admin surface.
//!
//! Full account CRUD lives in the adjacent administration service; this
//! endpoint exists so the role policy has a real resource to govern.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use crate::db::{AccountSummary, Database};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
}

pub fn router(state: UsersState) -> Router {
    Router::new().route("/", get(list_users)).with_state(state)
}

#[derive(Serialize)]
struct ListUsersResponse {
    users: Vec<AccountSummary>,
}

async fn list_users(State(state): State<UsersState>) -> Result<Json<ListUsersResponse>, ApiError> {
    let users = state
        .db
        .users()
        .list()
        .await
        .db_err("Failed to list accounts")?;

    Ok(Json(ListUsersResponse { users }))
}
