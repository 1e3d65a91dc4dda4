//! In-memory user directory.

use std::collections::HashMap;
use std::sync::RwLock;

use registra_auth::{LifecycleState, UserRecord, UserStore};
use registra_core::{StoreError, UserId};

/// In-memory [`UserStore`].
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::unavailable("user lock poisoned"))?;
        users.get(&user_id).cloned().ok_or(StoreError::NotFound)
    }

    fn create_user(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::unavailable("user lock poisoned"))?;
        if users.contains_key(&record.user_id) {
            return Err(StoreError::conflict(format!(
                "user {} already exists",
                record.user_id
            )));
        }
        users.insert(record.user_id, record);
        Ok(())
    }

    fn set_password_hash(&self, user_id: UserId, password_hash: String) -> Result<(), StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::unavailable("user lock poisoned"))?;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash;
        Ok(())
    }

    fn set_lifecycle(&self, user_id: UserId, state: LifecycleState) -> Result<(), StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::unavailable("user lock poisoned"))?;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.lifecycle = state;
        Ok(())
    }
}
