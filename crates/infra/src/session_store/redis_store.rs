//! Redis-backed session registry.
//!
//! Sessions are shared state across service instances, so they live in an
//! external low-latency key-value store. Keys carry the absolute TTL;
//! revocation tombstones the record in place (TTL preserved) so a revoked
//! session stays distinguishable from an unknown one until redis expires it.
//!
//! Every call carries a connection and command timeout; a timeout surfaces
//! as retryable `StoreError::Unavailable`, never as a deny.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use registra_auth::{SessionPolicy, SessionRecord, SessionStore};
use registra_core::{SessionId, StoreError, UserId};

const SESSION_KEY_PREFIX: &str = "registra:session:";
const USER_SESSIONS_PREFIX: &str = "registra:user-sessions:";

/// Default per-call timeout against redis.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    policy: SessionPolicy,
    timeout: Duration,
}

impl RedisSessionStore {
    /// Connect lazily to `redis_url` (e.g. "redis://localhost:6379").
    pub fn new(redis_url: impl AsRef<str>, policy: SessionPolicy) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(Self {
            client,
            policy,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn conn(&self) -> Result<redis::Connection, StoreError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        conn.set_read_timeout(Some(self.timeout))
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        conn.set_write_timeout(Some(self.timeout))
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(conn)
    }

    fn session_key(session_id: SessionId) -> String {
        format!("{SESSION_KEY_PREFIX}{session_id}")
    }

    fn user_key(user_id: UserId) -> String {
        format!("{USER_SESSIONS_PREFIX}{user_id}")
    }

    fn ttl_secs(&self) -> i64 {
        self.policy.absolute_ttl.num_seconds().max(1)
    }

    fn load(
        &self,
        conn: &mut redis::Connection,
        session_id: SessionId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::session_key(session_id))
            .query(conn)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        match payload {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::unavailable(format!("corrupt session record: {e}"))),
        }
    }

    /// Rewrite a record in place, preserving the key's remaining TTL.
    fn store_keepttl(
        &self,
        conn: &mut redis::Connection,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        redis::cmd("SET")
            .arg(Self::session_key(record.session_id))
            .arg(payload)
            .arg("KEEPTTL")
            .query::<()>(conn)
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }
}

impl SessionStore for RedisSessionStore {
    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<SessionId, StoreError> {
        let session_id = SessionId::new();
        let record = SessionRecord {
            session_id,
            user_id,
            issued_at: now,
            expires_at: now + self.policy.absolute_ttl,
            last_seen_at: now,
            revoked: false,
        };
        let payload = serde_json::to_string(&record)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        let mut conn = self.conn()?;
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(Self::session_key(session_id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs())
            .ignore()
            .cmd("SADD")
            .arg(Self::user_key(user_id))
            .arg(session_id.to_string())
            .ignore()
            .cmd("EXPIRE")
            .arg(Self::user_key(user_id))
            .arg(self.ttl_secs())
            .ignore()
            .query::<()>(&mut conn)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        Ok(session_id)
    }

    fn get(&self, session_id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.conn()?;
        self.load(&mut conn, session_id)
    }

    fn touch(&self, session_id: SessionId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        if let Some(mut record) = self.load(&mut conn, session_id)? {
            if !record.revoked {
                record.last_seen_at = now;
                self.store_keepttl(&mut conn, &record)?;
            }
        }
        Ok(())
    }

    fn revoke(&self, session_id: SessionId) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        if let Some(mut record) = self.load(&mut conn, session_id)? {
            record.revoked = true;
            self.store_keepttl(&mut conn, &record)?;
        }
        Ok(())
    }

    fn revoke_all(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(Self::user_key(user_id))
            .query(&mut conn)
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        for member in members {
            let Ok(session_id) = member.parse::<SessionId>() else {
                warn!(user_id = %user_id, member, "skipping unparseable session id in user set");
                continue;
            };
            if let Some(mut record) = self.load(&mut conn, session_id)? {
                if !record.revoked {
                    record.revoked = true;
                    self.store_keepttl(&mut conn, &record)?;
                }
            }
        }
        Ok(())
    }
}
