//! Session issuance: login, token refresh, and logout.
//!
//! The issuer owns all writes to the refresh credential table. Request
//! authentication never touches it; it only verifies self-contained access
//! tokens.

use std::sync::Arc;

use tracing::{error, warn};

use crate::db::{AccountStatus, AuthUser, Database};
use crate::jwt::{self, JwtConfig, RefreshTokenResult};
use crate::password;

/// Tokens produced by a successful login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    /// None when refresh was served by a non-rotating issuer
    pub refresh_token: Option<String>,
    pub email: String,
    pub role: crate::db::Role,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Errors from login/refresh/logout flows.
///
/// `AccountNotFound` is an internal distinction for a subject that vanished
/// between credential validation and account lookup; the API boundary
/// reports it as 401 so account existence never leaks.
#[derive(Debug)]
pub enum SessionError {
    /// Unknown identifier or wrong password. Deliberately one variant for
    /// both so the externally visible failure carries no enumeration signal.
    InvalidCredentials,
    /// Refresh token unknown, expired, or revoked
    InvalidRefreshToken,
    /// Account exists but is not active
    AccountInactive,
    /// Subject vanished after its credential validated
    AccountNotFound,
    /// Token minting failed
    TokenGeneration,
    /// Credential or identity store failure
    Database,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidCredentials => write!(f, "Invalid username or password"),
            SessionError::InvalidRefreshToken => write!(f, "Invalid or expired refresh token"),
            SessionError::AccountInactive => write!(f, "Account is not active"),
            SessionError::AccountNotFound => write!(f, "Account not found"),
            SessionError::TokenGeneration => write!(f, "Failed to generate token"),
            SessionError::Database => write!(f, "Database error"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Orchestrates credential issuance and rotation.
#[derive(Clone)]
pub struct SessionIssuer {
    db: Database,
    jwt: Arc<JwtConfig>,
    /// Rotate-on-every-refresh. On by default; the toggle exists for
    /// deployments that hand out long-lived refresh tokens to native
    /// clients that cannot atomically swap stored credentials.
    rotate_refresh: bool,
}

impl SessionIssuer {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self {
            db,
            jwt,
            rotate_refresh: true,
        }
    }

    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate_refresh = rotate;
        self
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Authenticate with email and password and issue a fresh token pair.
    pub async fn login(&self, email: &str, pass: &str) -> Result<IssuedTokens, SessionError> {
        let user = self
            .db
            .users()
            .find_by_email(email)
            .await
            .map_err(db_error)?
            .ok_or(SessionError::InvalidCredentials)?;

        let verified = password::verify_password(pass, &user.password_hash).map_err(|e| {
            error!(error = %e, "Password verification failed");
            SessionError::InvalidCredentials
        })?;
        if !verified {
            return Err(SessionError::InvalidCredentials);
        }

        self.check_active(&user)?;

        let access = self
            .jwt
            .generate_access_token(&user.id, &user.email, user.role)
            .map_err(token_error)?;
        let refresh = self
            .jwt
            .generate_refresh_token(&user.id, &user.email)
            .map_err(token_error)?;

        self.store_refresh(&user.id, &refresh).await?;

        let now = jwt::now_secs().map_err(token_error)? as i64;
        self.db
            .users()
            .update_last_login(&user.id, now)
            .await
            .map_err(db_error)?;

        Ok(IssuedTokens {
            access_token: access.token,
            refresh_token: Some(refresh.token),
            email: user.email,
            role: user.role,
            expires_in: access.expires_in,
        })
    }

    /// Exchange a refresh token for a new access token, rotating the refresh
    /// credential unless rotation is disabled.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, SessionError> {
        // Cheap reject before the store lookup: garbage, forged, or expired
        // JWTs never reach the database.
        self.jwt
            .decode_refresh_token(refresh_token)
            .map_err(|_| SessionError::InvalidRefreshToken)?;

        let now = jwt::now_secs().map_err(token_error)? as i64;
        let record = self
            .db
            .tokens()
            .find_valid(refresh_token, now)
            .await
            .map_err(db_error)?
            .ok_or(SessionError::InvalidRefreshToken)?;

        let user = self
            .db
            .users()
            .find_by_id(&record.user_id)
            .await
            .map_err(db_error)?
            .ok_or(SessionError::AccountNotFound)?;

        self.check_active(&user)?;

        let access = self
            .jwt
            .generate_access_token(&user.id, &user.email, user.role)
            .map_err(token_error)?;

        let new_refresh = if self.rotate_refresh {
            self.db
                .tokens()
                .revoke(record.id)
                .await
                .map_err(db_error)?;

            let refresh = self
                .jwt
                .generate_refresh_token(&user.id, &user.email)
                .map_err(token_error)?;
            self.store_refresh(&user.id, &refresh).await?;
            Some(refresh.token)
        } else {
            None
        };

        Ok(IssuedTokens {
            access_token: access.token,
            refresh_token: new_refresh,
            email: user.email,
            role: user.role,
            expires_in: access.expires_in,
        })
    }

    /// Best-effort revocation on logout. Clearing the transport cookies is
    /// what actually ends the session; a failure here is logged, never
    /// surfaced.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else { return };
        let Ok(claims) = self.jwt.decode_refresh_token(token) else {
            return;
        };
        if let Err(e) = self.db.tokens().revoke_all_for_user(&claims.sub).await {
            warn!(error = %e, "Failed to revoke tokens on logout");
        }
    }

    fn check_active(&self, user: &AuthUser) -> Result<(), SessionError> {
        if user.status != AccountStatus::Active {
            return Err(SessionError::AccountInactive);
        }
        Ok(())
    }

    /// Revoke every prior credential for the subject, then insert the new
    /// one. The two statements are not one transaction: two concurrent
    /// refreshes for the same subject can each pass `find_valid` and each
    /// insert, leaving two live rows. Accepted: multi-device deployments
    /// rely on concurrent refresh not forcing re-login, and a revoked or
    /// expired row is never again usable regardless.
    async fn store_refresh(
        &self,
        user_id: &str,
        refresh: &RefreshTokenResult,
    ) -> Result<(), SessionError> {
        self.db
            .tokens()
            .revoke_all_for_user(user_id)
            .await
            .map_err(db_error)?;
        self.db
            .tokens()
            .insert(
                user_id,
                &refresh.token,
                refresh.issued_at as i64,
                refresh.expires_at as i64,
            )
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> SessionError {
    error!(error = %e, "Store operation failed");
    SessionError::Database
}

fn token_error(e: jwt::JwtError) -> SessionError {
    error!(error = %e, "Token generation failed");
    SessionError::TokenGeneration
}
