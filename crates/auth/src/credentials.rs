//! The credential vault.
//!
//! Verifies presented secrets against stored hashes and rotates them. A
//! secret rotation atomically revokes every live session for the user: a
//! password change must not leave old tokens usable.

use thiserror::Error;

use registra_core::{StoreError, UserId};

use crate::password::{self, PasswordError};
use crate::session::SessionStore;
use crate::store::UserStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] PasswordError),
}

pub struct CredentialVault<U, S> {
    users: U,
    sessions: S,
}

impl<U, S> CredentialVault<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    pub fn new(users: U, sessions: S) -> Self {
        Self { users, sessions }
    }

    /// Check `presented` against the stored hash for `user_id`.
    ///
    /// Unknown user and wrong secret are indistinguishable to the caller:
    /// both come back `Ok(false)`. The unknown-user path burns a hash so the
    /// two cases cost the same wall-clock time.
    pub fn verify(&self, user_id: UserId, presented: &str) -> Result<bool, VaultError> {
        let user = match self.users.get_user(user_id) {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                let _ = password::hash_password(presented);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        match password::verify_password(presented, &user.password_hash) {
            Ok(matched) => Ok(matched),
            Err(e) => {
                // A hash that no longer parses is operator trouble, not a
                // caller-visible distinction.
                tracing::error!(user_id = %user_id, error = %e, "stored password hash is corrupt");
                Ok(false)
            }
        }
    }

    /// Rotate the secret for `user_id` and revoke all their sessions.
    pub fn set_secret(&self, user_id: UserId, new_secret: &str) -> Result<(), VaultError> {
        let hash = password::hash_password(new_secret)?;
        self.users.set_password_hash(user_id, hash)?;
        self.sessions.revoke_all(user_id)?;
        tracing::info!(user_id = %user_id, "secret rotated, all sessions revoked");
        Ok(())
    }
}
