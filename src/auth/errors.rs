//! Authorization error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Denials produced by the authorization layer. `Unauthorized` means no
/// identity was established where one is required; `Forbidden` means the
/// identity's role is insufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    Unauthorized,
    Forbidden,
}

impl AuthzError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthzError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthzError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthzError::Unauthorized => "Authentication required",
            AuthzError::Forbidden => "Insufficient permissions",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
