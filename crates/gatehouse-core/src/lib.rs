//! # gatehouse-core
//!
//! Core building blocks shared by every Gatehouse crate: the unified
//! error type, configuration schemas, and the injectable clock.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;

pub use clock::{Clock, SystemClock};
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
