//! Signed bearer token creation and verification.

mod claims;
mod issuer;

pub use claims::Claims;
pub use issuer::{IssuedToken, TokenIssuer};
