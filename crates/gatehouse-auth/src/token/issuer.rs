//! Bearer token signing and verification.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use gatehouse_core::clock::Clock;
use gatehouse_core::config::auth::AuthConfig;
use gatehouse_core::error::AppError;

use super::claims::Claims;

/// A freshly signed token together with its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The serialized, signed token.
    pub token: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token's own expiry claim lapses.
    pub expires_at: DateTime<Utc>,
}

/// Creates and verifies HMAC-signed bearer tokens.
///
/// The signing algorithm is pinned to HS256; tokens signed with any
/// other algorithm are rejected outright. Expiry is checked against the
/// injected clock rather than the process wall clock.
#[derive(Clone)]
pub struct TokenIssuer {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration (signature and claim presence only).
    validation: Validation,
    /// Time source for expiry checks.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenIssuer {
    /// Creates a new issuer from auth configuration.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked manually against the injected clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            clock,
        }
    }

    /// Signs a new token for the given subject with the given TTL.
    pub fn issue(&self, subject: Uuid, ttl: Duration) -> Result<IssuedToken, AppError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + ttl;

        let claims = Claims {
            sub: subject,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Decodes and validates a token string.
    ///
    /// Checks:
    /// 1. Signature validity (HS256 only)
    /// 2. Well-formedness of the claims payload
    /// 3. Expiry claim against the injected clock
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::unauthorized("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::unauthorized("Invalid token signature")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                        AppError::unauthorized("Unsupported token algorithm")
                    }
                    _ => AppError::unauthorized(format!("Token validation failed: {e}")),
                }
            })?;

        let claims = token_data.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AppError::unauthorized("Token has expired"));
        }

        Ok(claims)
    }
}
