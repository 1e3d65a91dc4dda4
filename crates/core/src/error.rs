//! Domain and store error models.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong in [`StoreError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, out-of-range score).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Failure of an external store collaborator (user directory, catalog,
/// result store, session registry, audit log).
///
/// `Unavailable` covers connection failures and timeouts and is the only
/// retryable variant; it must never be conflated with a deny or a
/// domain-level rejection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness or optimistic-concurrency check failed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store could not be reached or did not answer in time. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether the caller may safely retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
