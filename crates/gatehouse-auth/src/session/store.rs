//! Session storage operations wrapping the database repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::repositories::session::SessionRepository;
use gatehouse_entity::session::Session;

/// Owns session records and their lookup-by-token semantics.
#[derive(Clone)]
pub struct SessionStore {
    /// Session persistence.
    repo: Arc<dyn SessionRepository>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish()
    }
}

impl SessionStore {
    /// Creates a new session store.
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Persists a new session. First writer wins on the token key; a
    /// second insert with the same token is a conflict.
    pub async fn create(&self, session: &Session) -> AppResult<Session> {
        self.repo.create(session).await
    }

    /// Finds the session bound to `token`, provided it is still live.
    ///
    /// An expired-but-not-yet-swept row is treated identically to a
    /// missing one.
    pub async fn get_live_by_token(&self, token: &str, now: DateTime<Utc>) -> AppResult<Session> {
        if token.is_empty() {
            return Err(AppError::validation("Session token must not be empty"));
        }
        self.repo
            .find_live_by_token(token, now)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))
    }

    /// Atomically replaces the session bound to `old_token` with `next`.
    ///
    /// The delete and insert commit as one unit; a crash in between
    /// leaves the old session intact rather than zero or two live
    /// sessions for the same login.
    pub async fn replace(&self, old_token: &str, next: &Session) -> AppResult<Session> {
        if old_token.is_empty() {
            return Err(AppError::validation("Session token must not be empty"));
        }
        self.repo.replace(old_token, next).await
    }

    /// Deletes the session bound to `token`. A missing row is a
    /// not-found condition, distinct from a storage error.
    pub async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        if token.is_empty() {
            return Err(AppError::validation("Session token must not be empty"));
        }
        self.repo.delete_by_token(token).await
    }

    /// Deletes every session belonging to the given account and
    /// returns the count.
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        self.repo.delete_all_for_user(user_id).await
    }

    /// Deletes every session whose expiry has passed and returns the
    /// count. Used by the background reclaimer only.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.repo.delete_expired(now).await
    }
}
