//! Account lifecycle state machine.
//!
//! Lifecycle state is administrative status, distinct from session validity:
//! a suspended user can hold a cryptographically valid token and a live
//! session and must still be denied. Transitions are admin-triggered events,
//! never self-service, and every transition is audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use registra_core::{StoreError, UserId};
use registra_events::{AuditEntry, AuditLog};

use crate::roles::Role;
use crate::session::SessionStore;
use crate::store::UserStore;

/// Administrative status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Active,
    Suspended,
    Disabled,
}

impl LifecycleState {
    /// Only active accounts may act. Every authorization check consults this
    /// before evaluating role permissions.
    pub fn is_actionable(self) -> bool {
        matches!(self, LifecycleState::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::Suspended => "suspended",
            LifecycleState::Disabled => "disabled",
        }
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The acting identity is not an admin.
    #[error("only admins may change account lifecycle state")]
    Forbidden,

    /// The requested edge is not in the allowed set.
    #[error("illegal lifecycle transition {from} -> {to}")]
    InvalidEdge {
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// The allowed transition edges.
///
/// A disabled account cannot be suspended; it must first be reactivated to
/// `active`. Reactivation (disabled -> active) is a distinct transition from
/// un-suspension and is audited separately.
pub fn allowed_edge(from: LifecycleState, to: LifecycleState) -> bool {
    use LifecycleState::*;
    matches!(
        (from, to),
        (Active, Suspended) | (Suspended, Active) | (Active, Disabled) | (Disabled, Active)
    )
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lifecycle service: validates the edge, persists the new state, keeps the
/// materialized session state in agreement, and appends the audit entry.
pub struct AccountLifecycle<U, S, A> {
    users: U,
    sessions: S,
    audit: A,
}

impl<U, S, A> AccountLifecycle<U, S, A>
where
    U: UserStore,
    S: SessionStore,
    A: AuditLog,
{
    pub fn new(users: U, sessions: S, audit: A) -> Self {
        Self {
            users,
            sessions,
            audit,
        }
    }

    /// Transition `user_id` to `new_state` on behalf of `actor_id`.
    ///
    /// Disabling revokes every live session for the subject: disabled means
    /// inactionable immediately, not just on the next lifecycle read.
    pub fn transition(
        &self,
        user_id: UserId,
        new_state: LifecycleState,
        actor_id: UserId,
        actor_role: Role,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if actor_role != Role::Admin {
            return Err(TransitionError::Forbidden.into());
        }

        let user = self.users.get_user(user_id)?;
        let from = user.lifecycle;

        if !allowed_edge(from, new_state) {
            return Err(TransitionError::InvalidEdge {
                from,
                to: new_state,
            }
            .into());
        }

        self.users.set_lifecycle(user_id, new_state)?;

        if new_state == LifecycleState::Disabled {
            self.sessions.revoke_all(user_id)?;
        }

        let mut entry = AuditEntry::new(actor_id, user_id, from.as_str(), new_state.as_str(), now);
        if from == LifecycleState::Disabled && new_state == LifecycleState::Active {
            entry = entry.with_detail("reactivation");
        }
        self.audit.append(entry)?;

        tracing::info!(
            user_id = %user_id,
            from = %from,
            to = %new_state,
            actor_id = %actor_id,
            "account lifecycle transition"
        );

        Ok(())
    }

    pub fn is_actionable(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.get_user(user_id)?.lifecycle.is_actionable())
    }
}
