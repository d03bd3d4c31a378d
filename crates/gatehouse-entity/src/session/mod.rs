//! Session entity.

mod model;

pub use model::Session;
