//! # gatehouse-reclaimer
//!
//! Periodic background sweeps that keep authentication state
//! consistent over time: expired sessions are deleted and lapsed
//! account locks are released.

mod sweeper;

pub use sweeper::Reclaimer;
