//! # gatehouse-auth
//!
//! Credential handling, token issuance, and session lifecycle
//! management for the Gatehouse authentication core.
//!
//! ## Modules
//!
//! - `password` — Argon2id hashing and entropy policy enforcement
//! - `token` — signed bearer token creation and verification
//! - `account` — user account registration, lookup, and lockout bookkeeping
//! - `session` — session persistence and the login/rotate/logout state machine

pub mod account;
pub mod password;
pub mod session;
pub mod token;

pub use account::AccountStore;
pub use password::{PasswordHasher, PasswordPolicy};
pub use session::{AuthState, SessionManager, SessionStore};
pub use token::{Claims, IssuedToken, TokenIssuer};
