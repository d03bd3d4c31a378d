//! # gatehouse-test-support
//!
//! Deterministic substitutes for the storage and time seams: a manual
//! clock and in-memory repository implementations that mirror the
//! PostgreSQL semantics (unique constraints, cascades, not-found
//! signalling) closely enough for lifecycle tests.

mod clock;
mod memory;

pub use clock::ManualClock;
pub use memory::{MemoryBackend, MemorySessionRepository, MemoryUserRepository};
