//! User account operations.

mod store;

pub use store::AccountStore;
