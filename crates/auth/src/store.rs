//! The user directory seam.
//!
//! The authority reads and writes user records only through this trait, so
//! the backing engine (in-memory for tests, SQL in production) stays out of
//! the authorization logic.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use registra_core::{StoreError, UserId};

use crate::lifecycle::LifecycleState;
use crate::roles::Role;

/// A user as the authority sees it.
///
/// This is the minimal field set the access decisions need; profile data
/// (names, departments, matriculation numbers) lives with the storage
/// collaborator and never enters the authority.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    pub role: Role,
    /// Argon2id PHC string. Never the clear secret.
    pub password_hash: String,
    pub lifecycle: LifecycleState,
    pub created_at: DateTime<Utc>,
}

// Manual Debug: the hash is not a secret, but it has no business in logs.
impl core::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserRecord")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("password_hash", &"<redacted>")
            .field("lifecycle", &self.lifecycle)
            .field("created_at", &self.created_at)
            .finish()
    }
}

pub trait UserStore: Send + Sync {
    fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError>;

    /// Insert a new user. Fails with `Conflict` if the id is taken.
    fn create_user(&self, record: UserRecord) -> Result<(), StoreError>;

    fn set_password_hash(&self, user_id: UserId, password_hash: String) -> Result<(), StoreError>;

    fn set_lifecycle(&self, user_id: UserId, state: LifecycleState) -> Result<(), StoreError>;
}

impl<U> UserStore for Arc<U>
where
    U: UserStore + ?Sized,
{
    fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        (**self).get_user(user_id)
    }

    fn create_user(&self, record: UserRecord) -> Result<(), StoreError> {
        (**self).create_user(record)
    }

    fn set_password_hash(&self, user_id: UserId, password_hash: String) -> Result<(), StoreError> {
        (**self).set_password_hash(user_id, password_hash)
    }

    fn set_lifecycle(&self, user_id: UserId, state: LifecycleState) -> Result<(), StoreError> {
        (**self).set_lifecycle(user_id, state)
    }
}
