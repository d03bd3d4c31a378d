//! User repository trait and PostgreSQL implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::user::{User, UserChanges};

/// Storage operations on user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account with the given email and password hash.
    ///
    /// Fails with a conflict if the email is already registered.
    async fn create(&self, email: &str, password_hash: &str) -> AppResult<User>;

    /// Find an account by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find an account by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Apply an account update. Absent fields are left as-is.
    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<User>;

    /// Record a successful login time.
    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Bump the failed-attempt counter and return the new value.
    ///
    /// Fails with not-found if no such account exists; the same goes
    /// for the other per-account lockout operations below.
    async fn increment_failed_attempts(&self, id: Uuid) -> AppResult<i32>;

    /// Reset the failed-attempt counter to zero.
    async fn reset_failed_attempts(&self, id: Uuid) -> AppResult<()>;

    /// Lock the account until the given time.
    async fn lock_until(&self, id: Uuid, until: DateTime<Utc>) -> AppResult<()>;

    /// Clear the lock flag, deadline, and failed-attempt counter.
    async fn unlock(&self, id: Uuid) -> AppResult<()>;

    /// Unlock every account whose lock deadline has passed.
    ///
    /// Returns the number of accounts unlocked.
    async fn unlock_all_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Permanently delete an account. Sessions go with it.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// PostgreSQL-backed user repository.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING *",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
                AppError::conflict("Email already in use".to_string())
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create user", e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by email", e)
            })
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET email = COALESCE($2, email), \
                              password_hash = COALESCE($3, password_hash), \
                              updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
                AppError::conflict("Email already in use".to_string())
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to update user", e),
        })?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET last_login = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(at)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
                })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn increment_failed_attempts(&self, id: Uuid) -> AppResult<i32> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE users SET failed_login_attempts = failed_login_attempts + 1, \
                              updated_at = NOW() \
             WHERE id = $1 RETURNING failed_login_attempts",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to increment failed attempts", e)
        })?;

        row.map(|(attempts,)| attempts)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn reset_failed_attempts(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET failed_login_attempts = 0, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reset failed attempts", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn lock_until(&self, id: Uuid, until: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET account_locked = TRUE, account_locked_until = $2, \
                              updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(until)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock user", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn unlock(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET account_locked = FALSE, account_locked_until = NULL, \
                              failed_login_attempts = 0, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unlock user", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn unlock_all_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET account_locked = FALSE, account_locked_until = NULL, \
                              failed_login_attempts = 0, updated_at = NOW() \
             WHERE account_locked = TRUE AND account_locked_until IS NOT NULL \
               AND account_locked_until < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to unlock expired locks", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete user", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }
}
