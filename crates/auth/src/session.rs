//! The revocable-session contract.
//!
//! Sessions make bearer tokens revocable: a token's signature stays valid
//! until `exp`, but the session it names can be killed at any moment (logout,
//! password change, account disable). Token verification and session
//! liveness are deliberately orthogonal; callers check both.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use registra_core::{SessionId, StoreError, UserId};

/// A server-tracked session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    /// Absolute expiry; fixed at creation.
    pub expires_at: DateTime<Utc>,
    /// Updated on every authorized request (sliding idle window).
    pub last_seen_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Why a session failed validation. Each cause is reported distinctly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has been revoked")]
    Revoked,

    #[error("session has expired")]
    Expired,

    #[error("unknown session")]
    Unknown,
}

/// Session validity policy: absolute lifetime plus an idle window.
///
/// Idle expiry is lazy: it is evaluated on lookup, so no background sweep
/// is needed for correctness (only for storage hygiene).
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub absolute_ttl: Duration,
    pub idle_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            absolute_ttl: Duration::hours(12),
            idle_timeout: Duration::minutes(30),
        }
    }
}

impl SessionPolicy {
    /// Evaluate a looked-up record. Pure; the lookup itself is the store's
    /// concern.
    pub fn check(
        &self,
        record: Option<&SessionRecord>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let record = record.ok_or(SessionError::Unknown)?;
        if record.revoked {
            return Err(SessionError::Revoked);
        }
        if now >= record.expires_at {
            return Err(SessionError::Expired);
        }
        if now - record.last_seen_at > self.idle_timeout {
            return Err(SessionError::Expired);
        }
        Ok(())
    }
}

/// The external session registry.
///
/// Implementations must offer O(1) lookup and revocation independent of the
/// number of historical sessions, and atomicity at the level of a single
/// session id.
pub trait SessionStore: Send + Sync {
    /// Record a fresh session and return its unguessable id.
    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<SessionId, StoreError>;

    fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Slide the idle window.
    fn touch(&self, session_id: SessionId, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Revoke one session. Idempotent; revoking an unknown id is a no-op.
    fn revoke(&self, session_id: SessionId) -> Result<(), StoreError>;

    /// Global logout: revoke every live session for a user.
    fn revoke_all(&self, user_id: UserId) -> Result<(), StoreError>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<SessionId, StoreError> {
        (**self).create(user_id, now)
    }

    fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        (**self).get(session_id)
    }

    fn touch(&self, session_id: SessionId, now: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).touch(session_id, now)
    }

    fn revoke(&self, session_id: SessionId) -> Result<(), StoreError> {
        (**self).revoke(session_id)
    }

    fn revoke_all(&self, user_id: UserId) -> Result<(), StoreError> {
        (**self).revoke_all(user_id)
    }
}
