//! `registra-gateway` — the programmatic request boundary.
//!
//! Transports (HTTP, whatever else) are out of scope; they are expected to
//! parse a bearer token out of the wire format and call into
//! [`AccessGateway`]. Every protected operation runs the same chain before
//! business logic: token signature/expiry, session liveness, account
//! lifecycle, role-scoped permission.

pub mod error;
pub mod gateway;

pub use error::AccessError;
pub use gateway::{AccessGateway, AuthSuccess};
