//! Account registration, lookup, and lockout bookkeeping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use validator::ValidateEmail;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::repositories::user::UserRepository;
use gatehouse_entity::user::{AccountPatch, User, UserChanges, UserProfile};

use crate::password::{PasswordHasher, PasswordPolicy};

/// Maximum accepted email length, matching the column constraint.
const MAX_EMAIL_LENGTH: usize = 255;

/// Owns user account records: registration, lookup, partial updates,
/// and the failed-attempt/lockout counters.
///
/// The password hash never leaves this store except embedded in a
/// [`User`] row, which skips it on serialization.
#[derive(Clone)]
pub struct AccountStore {
    /// Account persistence.
    repo: Arc<dyn UserRepository>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Password strength policy.
    policy: PasswordPolicy,
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore").finish()
    }
}

impl AccountStore {
    /// Creates a new account store.
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<PasswordHasher>,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            repo,
            hasher,
            policy,
        }
    }

    /// Registers a new account.
    ///
    /// Validates the email shape and password strength before touching
    /// storage; a unique-constraint violation on the email surfaces as
    /// a conflict.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<User> {
        if email.is_empty() {
            return Err(AppError::validation("Email must not be empty"));
        }
        if password.is_empty() {
            return Err(AppError::validation("Password must not be empty"));
        }
        self.validate_email(email)?;
        self.policy.check(password)?;

        let password_hash = self.hasher.hash_password(password)?;
        let user = self.repo.create(email, &password_hash).await?;

        info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    /// Looks up an account by email.
    pub async fn lookup_by_email(&self, email: &str) -> AppResult<User> {
        self.repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Looks up an account by ID.
    pub async fn lookup_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Returns the public projection of an account.
    pub async fn profile(&self, id: Uuid) -> AppResult<UserProfile> {
        Ok(self.lookup_by_id(id).await?.profile())
    }

    /// Applies a partial account update.
    ///
    /// Present fields are re-validated the same way registration
    /// validates them; the password is hashed before persisting. An
    /// empty patch is a no-changes condition, not a silent success.
    pub async fn update(&self, id: Uuid, patch: &AccountPatch) -> AppResult<User> {
        if patch.is_empty() {
            return Err(AppError::no_changes("No changes made"));
        }

        let mut changes = UserChanges::default();

        if let Some(email) = &patch.email {
            self.validate_email(email)?;
            changes.email = Some(email.clone());
        }

        if let Some(password) = &patch.password {
            if password.is_empty() {
                return Err(AppError::validation("Password must not be empty"));
            }
            self.policy.check(password)?;
            changes.password_hash = Some(self.hasher.hash_password(password)?);
        }

        let user = self.repo.update(id, &changes).await?;
        info!(user_id = %user.id, "Account updated");
        Ok(user)
    }

    /// Records a successful login.
    pub async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.repo.update_last_login(id, at).await
    }

    /// Bumps the failed-login counter and returns the new count.
    pub async fn increment_failed_logins(&self, id: Uuid) -> AppResult<i32> {
        self.repo.increment_failed_attempts(id).await
    }

    /// Resets the failed-login counter.
    pub async fn reset_failed_logins(&self, id: Uuid) -> AppResult<()> {
        self.repo.reset_failed_attempts(id).await
    }

    /// Locks the account until the given time.
    pub async fn lock(&self, id: Uuid, until: DateTime<Utc>) -> AppResult<()> {
        self.repo.lock_until(id, until).await
    }

    /// Clears the lock and the failed-login counter.
    pub async fn unlock(&self, id: Uuid) -> AppResult<()> {
        self.repo.unlock(id).await
    }

    /// Unlocks every account whose lock deadline has passed.
    ///
    /// Returns the number of accounts unlocked. Used by the background
    /// reclaimer only.
    pub async fn unlock_all_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.repo.unlock_all_expired(now).await
    }

    /// Permanently deletes an account and, through the storage cascade,
    /// all of its sessions.
    pub async fn permanently_delete(&self, id: Uuid) -> AppResult<()> {
        self.repo.delete(id).await?;
        info!(user_id = %id, "Account permanently deleted");
        Ok(())
    }

    fn validate_email(&self, email: &str) -> AppResult<()> {
        if email.is_empty() {
            return Err(AppError::validation("Email must not be empty"));
        }
        if !email.validate_email() {
            return Err(AppError::validation("Invalid email address"));
        }
        if email.len() > MAX_EMAIL_LENGTH {
            return Err(AppError::validation(format!(
                "Email must be at most {MAX_EMAIL_LENGTH} characters"
            )));
        }
        Ok(())
    }
}
