//! User account entity.

mod model;

pub use model::{AccountPatch, User, UserChanges, UserProfile};
