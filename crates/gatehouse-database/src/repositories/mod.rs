//! Repository traits and their PostgreSQL implementations.
//!
//! The traits are the storage seam of the system: the lifecycle
//! manager and the reclaimer are written against them, so tests can
//! substitute in-memory implementations without a live database.

pub mod session;
pub mod user;

pub use session::{PgSessionRepository, SessionRepository};
pub use user::{PgUserRepository, UserRepository};
