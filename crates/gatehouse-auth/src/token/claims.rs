//! Claims structure embedded in every bearer token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims payload carried by a signed bearer token.
///
/// Beyond the subject and expiry, tokens are opaque to the rest of the
/// system; the session store is the authority on whether the session
/// behind a token is still valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Token ID. Makes two tokens for the same subject distinct even
    /// when minted within the same second.
    pub jti: Uuid,
}
