//! User account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique account identifier.
    pub id: Uuid,
    /// Unique email address, used as the login name.
    pub email: String,
    /// Argon2id password hash (PHC string).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Last successful login time.
    pub last_login: Option<DateTime<Utc>>,
    /// Number of consecutive failed login attempts.
    pub failed_login_attempts: i32,
    /// Whether the account is currently marked locked.
    pub account_locked: bool,
    /// Account locked until this time (if locked).
    pub account_locked_until: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check whether the account is locked as of `now`.
    ///
    /// A lock whose deadline has passed no longer counts, even if the
    /// stored flag has not been cleared yet.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        if !self.account_locked {
            return false;
        }
        match self.account_locked_until {
            Some(until) => now < until,
            None => true,
        }
    }

    /// Narrow the account down to its public projection.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            last_login: self.last_login,
        }
    }
}

/// Public projection of an account, safe to hand to callers.
///
/// Never carries the password hash or lockout bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Email address.
    pub email: String,
    /// Last successful login time.
    pub last_login: Option<DateTime<Utc>>,
}

/// Caller-supplied account update.
///
/// Absent fields are left untouched. The plaintext password is hashed
/// before the change is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AccountPatch {
    /// New email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// New plaintext password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl AccountPatch {
    /// Whether the patch carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// The persisted form of an [`AccountPatch`], password already hashed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    /// New email address.
    pub email: Option<String>,
    /// New password hash.
    pub password_hash: Option<String>,
}
