//! The authentication/authorization middleware and handler extractors.
//!
//! Authentication runs exactly once per request, in the middleware. The
//! extractors only read the identity the middleware attached, so a handler
//! can never trigger a second decode.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::errors::AuthzError;
use super::identity::{AuthFailure, Identity, authenticate};
use super::policy::{Decision, evaluate, route_policy};
use crate::jwt::JwtConfig;

/// Middleware: establish the request identity (if any) and apply the route
/// policy.
///
/// A failed decode degrades the request to anonymous instead of aborting
/// it; the failure reason is logged for diagnostics only. Whether anonymous
/// access is acceptable is entirely the policy table's decision.
pub async fn authorization_layer(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &jwt) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
        }
        Err(AuthFailure::NoToken) => {}
        Err(AuthFailure::Invalid(e)) => {
            tracing::debug!(error = %e, "Ignoring unverifiable bearer credential");
        }
    }

    let identity = request.extensions().get::<Identity>();
    match evaluate(route_policy(), request.method(), request.uri().path(), identity) {
        Decision::Permit => next.run(request).await,
        Decision::Unauthorized => AuthzError::Unauthorized.into_response(),
        Decision::Forbidden => AuthzError::Forbidden.into_response(),
    }
}

/// Extractor for handlers that need the authenticated identity.
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or(AuthzError::Unauthorized)
    }
}

/// Extractor for handlers that work with or without an identity.
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}
