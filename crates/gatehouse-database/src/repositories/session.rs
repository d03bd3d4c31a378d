//! Session repository trait and PostgreSQL implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::session::Session;

/// Storage operations on sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    ///
    /// Fails with a conflict if a session with the same token already
    /// exists.
    async fn create(&self, session: &Session) -> AppResult<Session>;

    /// Find the session bound to `token`, provided it has not expired
    /// as of `now`.
    async fn find_live_by_token(&self, token: &str, now: DateTime<Utc>) -> AppResult<Option<Session>>;

    /// Atomically remove the session bound to `old_token` and persist
    /// `next` in its place.
    ///
    /// Fails with not-found (and persists nothing) if `old_token` no
    /// longer maps to a session.
    async fn replace(&self, old_token: &str, next: &Session) -> AppResult<Session>;

    /// Remove the session bound to `token`.
    ///
    /// Fails with not-found if no such session exists.
    async fn delete_by_token(&self, token: &str) -> AppResult<()>;

    /// Remove every session belonging to the given account.
    ///
    /// Returns the number removed; fails with not-found if there were
    /// none.
    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// Remove every session whose expiry is strictly before `now`.
    ///
    /// Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// PostgreSQL-backed session repository.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &Session) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, token, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("sessions_token_key") =>
            {
                AppError::conflict("Session token already exists".to_string())
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create session", e),
        })
    }

    async fn find_live_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1 AND expires_at > $2")
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find session by token", e)
            })
    }

    async fn replace(&self, old_token: &str, next: &Session) -> AppResult<Session> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let deleted = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(old_token)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete old session", e)
            })?;

        if deleted.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(AppError::not_found("Session not found".to_string()));
        }

        let created = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, token, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(next.id)
        .bind(next.user_id)
        .bind(&next.token)
        .bind(next.created_at)
        .bind(next.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create replacement session", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit session rotation", e)
        })?;

        Ok(created)
    }

    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete session", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Session not found".to_string()));
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete user sessions", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "No sessions found for user {user_id}"
            )));
        }
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete expired sessions", e)
            })?;

        Ok(result.rows_affected())
    }
}
