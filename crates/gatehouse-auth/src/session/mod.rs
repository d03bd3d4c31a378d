//! Session persistence and lifecycle orchestration.

mod manager;
mod store;

pub use manager::{AuthState, SessionManager};
pub use store::SessionStore;
