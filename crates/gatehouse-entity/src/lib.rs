//! Domain entities for the credential and session lifecycle manager.

pub mod session;
pub mod user;

pub use session::Session;
pub use user::{AccountPatch, User, UserChanges, UserProfile};
