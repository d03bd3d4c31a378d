//! # gatehouse-database
//!
//! PostgreSQL connection management and concrete repository
//! implementations for the account and session stores.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{PgSessionRepository, PgUserRepository, SessionRepository, UserRepository};
