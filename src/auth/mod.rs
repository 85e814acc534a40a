//! Request authentication and role-based authorization.
//!
//! Dual-token system: short-lived access tokens are verified statelessly on
//! every request; long-lived refresh tokens are database-tracked and only
//! handled by the session issuer. A request with no credential, or with one
//! that fails to verify, proceeds as anonymous and is judged by the static
//! route policy.

mod cookie;
mod errors;
mod extractors;
mod identity;
mod policy;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, token_cookie,
};
pub use errors::AuthzError;
pub use extractors::{CurrentIdentity, MaybeIdentity, authorization_layer};
pub use identity::{AuthFailure, Identity, authenticate};
pub use policy::{Decision, PolicyRule, Requirement, evaluate, route_policy};
