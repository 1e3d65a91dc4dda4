use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use registra_auth::{SessionPolicy, SessionRecord, SessionStore};
use registra_core::{SessionId, StoreError, UserId};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, SessionRecord>,
    by_user: HashMap<UserId, HashSet<SessionId>>,
}

/// In-memory [`SessionStore`].
///
/// A single lock keeps the session map and the per-user index consistent;
/// the per-user index is what makes `revoke_all` independent of the number
/// of historical sessions overall.
#[derive(Debug)]
pub struct InMemorySessionStore {
    policy: SessionPolicy,
    inner: RwLock<Inner>,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Drop revoked and absolutely-expired records. Storage hygiene only;
    /// validity never depends on this running.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("session lock poisoned"))?;

        let dead: Vec<SessionId> = inner
            .sessions
            .values()
            .filter(|r| r.revoked || now >= r.expires_at)
            .map(|r| r.session_id)
            .collect();

        for session_id in &dead {
            if let Some(record) = inner.sessions.remove(session_id) {
                if let Some(ids) = inner.by_user.get_mut(&record.user_id) {
                    ids.remove(session_id);
                    if ids.is_empty() {
                        inner.by_user.remove(&record.user_id);
                    }
                }
            }
        }

        Ok(dead.len())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<SessionId, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("session lock poisoned"))?;

        let session_id = SessionId::new();
        let record = SessionRecord {
            session_id,
            user_id,
            issued_at: now,
            expires_at: now + self.policy.absolute_ttl,
            last_seen_at: now,
            revoked: false,
        };

        inner.sessions.insert(session_id, record);
        inner.by_user.entry(user_id).or_default().insert(session_id);
        Ok(session_id)
    }

    fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::unavailable("session lock poisoned"))?;
        Ok(inner.sessions.get(&session_id).cloned())
    }

    fn touch(&self, session_id: SessionId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("session lock poisoned"))?;
        if let Some(record) = inner.sessions.get_mut(&session_id) {
            if !record.revoked {
                record.last_seen_at = now;
            }
        }
        Ok(())
    }

    fn revoke(&self, session_id: SessionId) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("session lock poisoned"))?;
        if let Some(record) = inner.sessions.get_mut(&session_id) {
            record.revoked = true;
        }
        Ok(())
    }

    fn revoke_all(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("session lock poisoned"))?;
        let ids: Vec<SessionId> = inner
            .by_user
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        for session_id in ids {
            if let Some(record) = inner.sessions.get_mut(&session_id) {
                record.revoked = true;
            }
        }
        Ok(())
    }
}
