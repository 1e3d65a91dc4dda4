//! The caller-visible failure taxonomy.
//!
//! Everything here is recoverable at the request boundary and maps to a
//! structured denial; nothing crashes the process. Only
//! [`registra_auth::ConfigError`] (missing signing secret) is fatal, and that
//! one can only happen before the gateway exists.

use thiserror::Error;

use registra_auth::{
    DenyReason, LifecycleError, SessionError, TokenError, TransitionError, VaultError,
};
use registra_core::{DomainError, StoreError};
use registra_results::{ResultError, WorkflowError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Bad credentials. Deliberately coarse: wrong secret and unknown user
    /// are indistinguishable, so callers cannot enumerate accounts.
    #[error("authentication failed")]
    AuthFailed,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("denied: {0}")]
    Denied(#[from] DenyReason),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Lifecycle(#[from] TransitionError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccessError {
    /// Whether the caller may retry the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Store(e) if e.is_retryable())
    }
}

impl From<ResultError> for AccessError {
    fn from(value: ResultError) -> Self {
        match value {
            ResultError::Workflow(e) => AccessError::Workflow(e),
            ResultError::Store(e) => AccessError::Store(e),
            ResultError::Domain(e) => AccessError::Domain(e),
        }
    }
}

impl From<LifecycleError> for AccessError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Transition(e) => AccessError::Lifecycle(e),
            LifecycleError::Store(e) => AccessError::Store(e),
        }
    }
}

impl From<VaultError> for AccessError {
    fn from(value: VaultError) -> Self {
        match value {
            VaultError::Store(e) => AccessError::Store(e),
            // A hashing failure is operator trouble, surfaced as a retryable
            // infrastructure fault rather than anything credential-shaped.
            VaultError::Hash(e) => AccessError::Store(StoreError::unavailable(e.to_string())),
        }
    }
}
