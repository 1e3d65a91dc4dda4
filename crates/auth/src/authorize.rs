//! Role-scoped permission evaluation.
//!
//! `authorize` is a pure policy check over a fully resolved actor:
//! - No IO
//! - No panics
//! - No business logic

use serde::Serialize;
use thiserror::Error;

use registra_core::UserId;

use crate::actions::Action;
use crate::lifecycle::LifecycleState;
use crate::roles::Role;

/// A fully resolved acting identity.
///
/// Construction is the gateway's job (token -> session -> user record); by
/// the time an `Actor` exists, its lifecycle state is the store's current
/// state, not whatever the token claimed at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub lifecycle: LifecycleState,
}

/// Why a request was denied.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DenyReason {
    #[error("account not active ({state})")]
    AccountNotActive { state: LifecycleState },

    #[error("role is not permitted to perform this action")]
    RoleForbidden,

    #[error("actor does not own the target resource")]
    NotOwner,
}

/// Outcome of a permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluate whether `actor` may perform `action`, short-circuit, first match
/// wins:
///
/// 1. inactive lifecycle denies everything, regardless of role or action;
/// 2. the action must be in the role's permitted set;
/// 3. owner-scoped actions require `resource_owner == actor.user_id`, except
///    for admins, who satisfy ownership implicitly.
pub fn authorize(actor: &Actor, action: Action, resource_owner: Option<UserId>) -> Decision {
    if !actor.lifecycle.is_actionable() {
        return Decision::Deny(DenyReason::AccountNotActive {
            state: actor.lifecycle,
        });
    }

    if !action.is_permitted(actor.role) {
        return Decision::Deny(DenyReason::RoleForbidden);
    }

    if action.is_owner_scoped() && actor.role != Role::Admin {
        match resource_owner {
            Some(owner) if owner == actor.user_id => {}
            // Missing owner on an owner-scoped action is a caller bug;
            // failing closed is the only safe reading.
            _ => return Decision::Deny(DenyReason::NotOwner),
        }
    }

    Decision::Allow
}
