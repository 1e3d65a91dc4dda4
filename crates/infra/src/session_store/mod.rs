//! Session registry implementations.
//!
//! The contract lives in `registra-auth` ([`registra_auth::SessionStore`]);
//! this module provides the in-memory registry for tests/dev and, behind the
//! `redis` feature, the shared external registry for multi-instance
//! deployments.

mod in_memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use in_memory::InMemorySessionStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;
