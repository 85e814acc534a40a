//! Per-request identity derived from a bearer credential.

use axum::http::{HeaderMap, header};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use crate::db::Role;
use crate::jwt::{JwtConfig, JwtError};

/// The authenticated identity for one request. Built once by the
/// authentication layer, carried as a request extension, and discarded at
/// request end. There is no ambient current-user; handlers receive this
/// explicitly.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Subject (account id)
    pub subject: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Authority tag for the authorization layer.
    pub fn authority(&self) -> &'static str {
        self.role.authority()
    }
}

/// Why a request carries no identity. `NoToken` is the ordinary anonymous
/// case; `Invalid` means a credential was presented but did not verify.
/// Neither aborts the request: the authorization decision is where an
/// anonymous request gets rejected, so a forged token is indistinguishable
/// from no token at all from the outside.
#[derive(Debug)]
pub enum AuthFailure {
    NoToken,
    Invalid(JwtError),
}

/// Extract and verify the request's bearer credential.
///
/// Transport precedence: the `access_token` cookie wins; otherwise the
/// `Authorization` header is consulted and recognized only when its value
/// starts with the literal `Bearer ` prefix, the remainder being taken
/// verbatim as the token.
pub fn authenticate(headers: &HeaderMap, jwt: &JwtConfig) -> Result<Identity, AuthFailure> {
    let token = get_cookie(headers, ACCESS_COOKIE_NAME)
        .or_else(|| bearer_token(headers))
        .ok_or(AuthFailure::NoToken)?;

    let claims = jwt
        .decode_access_token(token)
        .map_err(AuthFailure::Invalid)?;

    Ok(Identity {
        subject: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
