//! Authentication API endpoints.
//!
//! - POST `/login` - Authenticate with email and password, set token cookies
//! - POST `/refresh-token` - Exchange the refresh token for a new pair
//! - POST `/logout` - Clear cookies and best-effort revoke
//! - GET `/me` - Profile of the authenticated account
//!
//! Issued tokens travel in HttpOnly cookies; response bodies never carry
//! token values.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, CurrentIdentity, REFRESH_COOKIE_NAME, clear_cookie, get_cookie,
    token_cookie,
};
use crate::db::{AccountSummary, Database, Role};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::session::{IssuedTokens, SessionIssuer};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub issuer: SessionIssuer,
    pub secure_cookies: bool,
}

pub fn router(state: AuthState, rate_limits: Arc<RateLimitConfig>) -> Router {
    Router::new()
        .route(
            "/login",
            post(login).layer(axum::middleware::from_fn_with_state(
                rate_limits,
                rate_limit_login,
            )),
        )
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct AuthResponse {
    message: &'static str,
    email: String,
    role: Role,
    expires_in: u64,
}

impl AuthResponse {
    fn new(message: &'static str, issued: &IssuedTokens) -> Self {
        Self {
            message,
            email: issued.email.clone(),
            role: issued.role,
            expires_in: issued.expires_in,
        }
    }
}

/// Set-Cookie headers for an issued token pair. The refresh cookie is only
/// written when the issuer actually produced a new refresh token.
fn issue_cookies(state: &AuthState, issued: &IssuedTokens) -> Vec<(axum::http::HeaderName, String)> {
    let jwt = state.issuer.jwt();
    let mut cookies = vec![(
        SET_COOKIE,
        token_cookie(
            ACCESS_COOKIE_NAME,
            &issued.access_token,
            jwt.access_ttl_secs(),
            state.secure_cookies,
        ),
    )];
    if let Some(refresh) = &issued.refresh_token {
        cookies.push((
            SET_COOKIE,
            token_cookie(
                REFRESH_COOKIE_NAME,
                refresh,
                jwt.refresh_ttl_secs(),
                state.secure_cookies,
            ),
        ));
    }
    cookies
}

async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.issuer.login(&request.email, &request.password).await?;

    Ok((
        StatusCode::OK,
        AppendHeaders(issue_cookies(&state, &issued)),
        Json(AuthResponse::new("Login successful", &issued)),
    ))
}

/// Body size cap for the refresh fallback payload.
const MAX_REFRESH_BODY_BYTES: usize = 16 * 1024;

/// Refresh the access token. The refresh token comes from its cookie;
/// clients that do not hold cookies may pass it in the body instead.
async fn refresh_token(
    State(state): State<AuthState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, body) = request.into_parts();

    let token = match get_cookie(&parts.headers, REFRESH_COOKIE_NAME) {
        Some(token) => Some(token.to_string()),
        None => {
            let bytes = axum::body::to_bytes(body, MAX_REFRESH_BODY_BYTES)
                .await
                .map_err(|_| ApiError::bad_request("Invalid request body"))?;
            if bytes.is_empty() {
                None
            } else {
                serde_json::from_slice::<RefreshRequest>(&bytes)
                    .map_err(|_| ApiError::bad_request("Invalid request body"))?
                    .refresh_token
            }
        }
    };
    let token = token.ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let issued = state.issuer.refresh(&token).await?;

    Ok((
        StatusCode::OK,
        AppendHeaders(issue_cookies(&state, &issued)),
        Json(AuthResponse::new("Token refreshed successfully", &issued)),
    ))
}

/// Logout clears both token cookies. Revocation of the refresh credential
/// is best-effort; the response is 200 regardless.
async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state
        .issuer
        .logout(get_cookie(&headers, REFRESH_COOKIE_NAME))
        .await;

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (
                SET_COOKIE,
                clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies),
            ),
            (
                SET_COOKIE,
                clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies),
            ),
        ]),
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

async fn me(
    State(state): State<AuthState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<AccountSummary>, ApiError> {
    let user = state
        .db
        .users()
        .find_by_id(&identity.subject)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(AccountSummary::from(user)))
}
