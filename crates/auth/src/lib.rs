//! `registra-auth` — the access authority (zero-trust, transport-agnostic).
//!
//! This crate is intentionally decoupled from HTTP and storage engines.
//! Storage is reached only through the narrow seams defined here
//! ([`UserStore`], [`SessionStore`]); transports sit above the gateway crate.

pub mod actions;
pub mod authorize;
pub mod credentials;
pub mod lifecycle;
pub mod password;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

pub use actions::{Action, permitted_actions};
pub use authorize::{Actor, Decision, DenyReason, authorize};
pub use credentials::{CredentialVault, VaultError};
pub use lifecycle::{AccountLifecycle, LifecycleError, LifecycleState, TransitionError};
pub use password::{PasswordError, hash_password, verify_password};
pub use roles::Role;
pub use session::{SessionError, SessionPolicy, SessionRecord, SessionStore};
pub use store::{UserRecord, UserStore};
pub use token::{ConfigError, TokenAuthority, TokenClaims, TokenError};
