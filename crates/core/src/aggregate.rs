//! Aggregate root trait for state-machine domain entities.

use crate::error::StoreError;

/// Aggregate root marker + minimal interface.
///
/// This is intentionally small so domain modules can decide how they model
/// state transitions (pure functions, event application, etc.) without
/// bringing in any infrastructure concerns.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Typically corresponds to the number of events applied. Stores use it
    /// to serialize conflicting transitions on the same aggregate.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate commit.
///
/// Two workers racing to transition the same record both read version `n`;
/// only the first commit with `Exact(n)` succeeds, the loser observes a
/// conflict and must re-read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent writes).
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> Result<(), StoreError> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(StoreError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO or side effects. They should only return
/// events describing what happened.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations should remain deterministic and should typically update
    /// their internal `version()` tracking consistently (e.g. +1 per applied event).
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
