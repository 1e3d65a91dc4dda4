//! Append-only audit trail for sensitive state transitions.
//!
//! Every account lifecycle change and every result transition that touches
//! `approved`/`rejected`/reopen must land here. Entries are facts: once
//! appended they are never updated or deleted.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use registra_core::{StoreError, UserId};

/// One audited state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,

    /// Who performed the transition.
    pub actor_id: UserId,

    /// The record that changed (a user id or a result id).
    pub target_id: Uuid,

    pub from_state: String,
    pub to_state: String,

    /// Free-form context (e.g. the prior approver on a reopen).
    pub detail: Option<String>,

    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_id: UserId,
        target_id: impl Into<Uuid>,
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            actor_id,
            target_id: target_id.into(),
            from_state: from_state.into(),
            to_state: to_state.into(),
            detail: None,
            recorded_at,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Append-only audit log, queryable by target and by time range.
pub trait AuditLog: Send + Sync {
    /// Append one entry. Implementations must never overwrite.
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// All entries for a given target, oldest first.
    fn by_target(&self, target_id: Uuid) -> Result<Vec<AuditEntry>, StoreError>;

    /// All entries recorded in `[from, to)`, oldest first.
    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, StoreError>;
}

impl<A> AuditLog for Arc<A>
where
    A: AuditLog + ?Sized,
{
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        (**self).append(entry)
    }

    fn by_target(&self, target_id: Uuid) -> Result<Vec<AuditEntry>, StoreError> {
        (**self).by_target(target_id)
    }

    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        (**self).in_range(from, to)
    }
}

/// In-memory audit log.
///
/// Intended for tests/dev. Entries are held in append order.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::unavailable("audit lock poisoned"))?;
        entries.push(entry);
        Ok(())
    }

    fn by_target(&self, target_id: Uuid) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::unavailable("audit lock poisoned"))?;
        Ok(entries
            .iter()
            .filter(|e| e.target_id == target_id)
            .cloned()
            .collect())
    }

    fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::unavailable("audit lock poisoned"))?;
        Ok(entries
            .iter()
            .filter(|e| e.recorded_at >= from && e.recorded_at < to)
            .cloned()
            .collect())
    }
}
