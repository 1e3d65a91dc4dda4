//! `registra-events` — domain events and the append-only audit trail.

pub mod audit;
pub mod event;

pub use audit::{AuditEntry, AuditLog, InMemoryAuditLog};
pub use event::Event;
