//! JWT minting and verification for the dual-token scheme.
//!
//! Access tokens are short-lived and self-contained; refresh tokens are
//! long-lived JWTs whose values are additionally tracked in the database
//! for revocation. Lifetimes are configuration, not constants.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::Role;

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account id)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Account role
    pub role: Role,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Claims carried by a refresh token. No role claim: the role is re-read
/// from the account on every refresh so a role change takes effect at
/// rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID, unique per issued token
    pub jti: String,
    /// Subject (account id)
    pub sub: String,
    /// Account email
    pub email: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Result of minting an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    pub token: String,
    /// Lifetime in seconds, for `expires_in` fields and cookie max-age
    pub expires_in: u64,
}

/// Result of minting a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    pub token: String,
    pub jti: String,
    pub issued_at: u64,
    pub expires_at: u64,
    pub expires_in: u64,
}

/// Signing/verification configuration shared by all token operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl JwtConfig {
    /// Create a configuration with the given secret and default lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_lifetimes(secret, DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS)
    }

    /// Create a configuration with explicit lifetimes (seconds).
    pub fn with_lifetimes(secret: &[u8], access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    /// Mint an access token for an account.
    pub fn generate_access_token(
        &self,
        account_id: &str,
        email: &str,
        role: Role,
    ) -> Result<AccessTokenResult, JwtError> {
        let now = now_secs()?;

        let claims = AccessClaims {
            sub: account_id.to_string(),
            email: email.to_string(),
            role,
            token_type: TokenType::Access,
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            expires_in: self.access_ttl_secs,
        })
    }

    /// Mint a refresh token for an account.
    pub fn generate_refresh_token(
        &self,
        account_id: &str,
        email: &str,
    ) -> Result<RefreshTokenResult, JwtError> {
        let now = now_secs()?;
        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + self.refresh_ttl_secs;

        let claims = RefreshClaims {
            jti: jti.clone(),
            sub: account_id.to_string(),
            email: email.to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            issued_at: now,
            expires_at: exp,
            expires_in: self.refresh_ttl_secs,
        })
    }

    /// Verify and decode an access token.
    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = self.decode(token)?;

        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        if claims.sub.is_empty() {
            return Err(JwtError::Malformed);
        }

        Ok(claims)
    }

    /// Verify and decode a refresh token.
    pub fn decode_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = self.decode(token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        if claims.sub.is_empty() {
            return Err(JwtError::Malformed);
        }

        Ok(claims)
    }

    /// Shared decode path. The signature is verified first, then expiry is
    /// checked by hand: a token is invalid at exactly `now >= exp`.
    fn decode<T: serde::de::DeserializeOwned + Expires>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<T>(token, &self.decoding_key, &validation)
            .map_err(JwtError::from_decode)?;

        if now_secs()? >= data.claims.exp() {
            return Err(JwtError::Expired);
        }

        Ok(data.claims)
    }
}

/// Claims that carry an expiry timestamp.
trait Expires {
    fn exp(&self) -> u64;
}

impl Expires for AccessClaims {
    fn exp(&self) -> u64 {
        self.exp
    }
}

impl Expires for RefreshClaims {
    fn exp(&self) -> u64 {
        self.exp
    }
}

/// Current Unix timestamp in seconds.
pub fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Errors from token minting and verification.
#[derive(Debug)]
pub enum JwtError {
    /// Signature does not verify (wrong key, corrupted payload, wrong algorithm)
    SignatureInvalid,
    /// Structural encoding cannot be parsed
    Malformed,
    /// Token past its expiry
    Expired,
    /// Valid token of the other kind presented
    WrongTokenType,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl JwtError {
    fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::ImmatureSignature => JwtError::SignatureInvalid,
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Malformed,
        }
    }
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::SignatureInvalid => write!(f, "Token signature is invalid"),
            JwtError::Malformed => write!(f, "Token is malformed"),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
