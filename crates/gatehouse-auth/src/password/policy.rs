//! Password strength policy enforcement for new passwords.

use gatehouse_core::config::auth::AuthConfig;
use gatehouse_core::error::AppError;

/// Validates password strength against the configured entropy floor.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum estimated entropy in bits.
    min_entropy_bits: f64,
}

impl PasswordPolicy {
    /// Creates a new policy from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_entropy_bits: config.min_entropy_bits,
        }
    }

    /// Validates a candidate password.
    ///
    /// Returns `Ok(())` if the estimated entropy meets the configured
    /// floor, or a validation error otherwise. The estimate comes from
    /// zxcvbn, so dictionary words and keyboard walks score far below
    /// their raw character-count entropy.
    pub fn check(&self, password: &str) -> Result<(), AppError> {
        let estimate = zxcvbn::zxcvbn(password, &[]);
        let entropy_bits = estimate.guesses_log10() * std::f64::consts::LOG2_10;

        if entropy_bits < self.min_entropy_bits {
            return Err(AppError::validation(
                "Password is too weak. Please use a longer or less predictable password.",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::ErrorKind;

    fn policy() -> PasswordPolicy {
        PasswordPolicy::new(&AuthConfig::default())
    }

    #[test]
    fn rejects_common_passwords() {
        for weak in ["password", "12345678", "qwertyuiop", "letmein!"] {
            let err = policy().check(weak).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{weak} should be rejected");
        }
    }

    #[test]
    fn accepts_high_entropy_passwords() {
        assert!(policy().check("jW3#nV8$qK5!xD2&mZ7_rT4c").is_ok());
        assert!(policy().check("0c1fc34bba0a1a6f9cb6e3f05f0cd6e7").is_ok());
    }
}
