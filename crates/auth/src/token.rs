//! Signed, time-bounded identity tokens.
//!
//! Verification is pure and stateless with respect to storage: it proves the
//! token was signed by this authority and has not expired, nothing more.
//! Revocation lives in the session registry and is checked by callers,
//! keeping the two concerns orthogonal.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use registra_core::{SessionId, UserId};

use crate::roles::Role;

/// Minimum bytes of signing secret accepted at startup.
const MIN_SECRET_BYTES: usize = 16;

/// Default token time-to-live when none is configured.
pub const DEFAULT_TTL_SECS: i64 = 900;

const SECRET_ENV: &str = "REGISTRA_TOKEN_SECRET";
const TTL_ENV: &str = "REGISTRA_TOKEN_TTL_SECS";

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,
    pub role: Role,
    /// The server-side session this token rides on.
    pub sid: SessionId,
    pub iat: i64,
    pub exp: i64,
}

/// Token verification failure. Each mode is reported distinctly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token has expired")]
    Expired,
}

/// Configuration failure. The only fatal error class: a service without a
/// signing secret must refuse to start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{SECRET_ENV} is not set")]
    MissingSecret,

    #[error("signing secret too short: need at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,

    #[error("invalid {TTL_ENV}: {0}")]
    InvalidTtl(String),
}

/// Issues and verifies HS256-signed bearer tokens.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            validation,
        })
    }

    /// Build from the environment (`REGISTRA_TOKEN_SECRET`, optional
    /// `REGISTRA_TOKEN_TTL_SECS`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var(SECRET_ENV).map_err(|_| ConfigError::MissingSecret)?;
        let ttl_secs = match std::env::var(TTL_ENV) {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|e| ConfigError::InvalidTtl(e.to_string()))?,
            Err(_) => DEFAULT_TTL_SECS,
        };
        Self::new(&secret, Duration::seconds(ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for `user_id` riding on `session_id`.
    pub fn issue(
        &self,
        user_id: UserId,
        role: Role,
        session_id: SessionId,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            role,
            sid: session_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Malformed)
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// Does not consult the session registry; callers must check session
    /// liveness separately.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                _ => TokenError::Malformed,
            })
    }
}
