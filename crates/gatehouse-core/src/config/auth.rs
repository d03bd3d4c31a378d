//! Authentication and session lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Credential, token, and lockout configuration.
///
/// These values are fixed for the lifetime of the process; nothing in
/// the lifecycle manager re-reads the environment at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256). Loaded from the process
    /// environment; never logged.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Session (and token) time-to-live in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Maximum failed login attempts before lockout.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: i32,
    /// Account lockout duration in minutes.
    #[serde(default = "default_lockout")]
    pub lockout_duration_minutes: u64,
    /// Minimum estimated password entropy in bits.
    #[serde(default = "default_min_entropy")]
    pub min_entropy_bits: f64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            session_ttl_seconds: default_session_ttl(),
            max_failed_attempts: default_max_failed(),
            lockout_duration_minutes: default_lockout(),
            min_entropy_bits: default_min_entropy(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

/// Seven days, matching the issued token's expiry claim.
fn default_session_ttl() -> u64 {
    3600 * 24 * 7
}

fn default_max_failed() -> i32 {
    5
}

fn default_lockout() -> u64 {
    15
}

fn default_min_entropy() -> f64 {
    64.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl_seconds, 604_800);
        assert_eq!(config.max_failed_attempts, 5);
        assert_eq!(config.lockout_duration_minutes, 15);
        assert_eq!(config.min_entropy_bits, 64.0);
    }
}
