//! In-memory repository implementations backed by a shared table set.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::clock::Clock;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::repositories::session::SessionRepository;
use gatehouse_database::repositories::user::UserRepository;
use gatehouse_entity::session::Session;
use gatehouse_entity::user::{User, UserChanges};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
}

/// Shared in-memory stand-in for the database.
///
/// Both repositories hand out by [`MemoryBackend`] operate on the same
/// tables, so deleting a user cascades to its sessions just as the
/// foreign key does in PostgreSQL.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    /// Creates an empty backend stamping rows with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            clock,
        }
    }

    /// A user repository view over this backend.
    pub fn users(&self) -> MemoryUserRepository {
        MemoryUserRepository {
            backend: self.clone(),
        }
    }

    /// A session repository view over this backend.
    pub fn sessions(&self) -> MemorySessionRepository {
        MemorySessionRepository {
            backend: self.clone(),
        }
    }

    /// Number of session rows currently stored, live or expired.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("tables lock poisoned")
    }
}

/// In-memory [`UserRepository`].
#[derive(Debug, Clone)]
pub struct MemoryUserRepository {
    backend: MemoryBackend,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> AppResult<User> {
        let now = self.backend.clock.now();
        let mut tables = self.backend.lock();

        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(AppError::conflict("Email already in use"));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            last_login: None,
            failed_login_attempts: 0,
            account_locked: false,
            account_locked_until: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.backend.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .backend
            .lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<User> {
        let now = self.backend.clock.now();
        let mut tables = self.backend.lock();

        if let Some(email) = &changes.email {
            if tables
                .users
                .iter()
                .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email))
            {
                return Err(AppError::conflict("Email already in use"));
            }
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;

        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.backend.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.last_login = Some(at);
        user.updated_at = at;
        Ok(())
    }

    async fn increment_failed_attempts(&self, id: Uuid) -> AppResult<i32> {
        let mut tables = self.backend.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.failed_login_attempts += 1;
        Ok(user.failed_login_attempts)
    }

    async fn reset_failed_attempts(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.backend.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.failed_login_attempts = 0;
        Ok(())
    }

    async fn lock_until(&self, id: Uuid, until: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.backend.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.account_locked = true;
        user.account_locked_until = Some(until);
        Ok(())
    }

    async fn unlock(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.backend.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.account_locked = false;
        user.account_locked_until = None;
        user.failed_login_attempts = 0;
        Ok(())
    }

    async fn unlock_all_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.backend.lock();
        let mut unlocked = 0u64;
        for user in tables.users.iter_mut() {
            if user.account_locked
                && user
                    .account_locked_until
                    .is_some_and(|until| until < now)
            {
                user.account_locked = false;
                user.account_locked_until = None;
                user.failed_login_attempts = 0;
                unlocked += 1;
            }
        }
        Ok(unlocked)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.backend.lock();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        tables.sessions.retain(|s| s.user_id != id);
        Ok(())
    }
}

/// In-memory [`SessionRepository`].
#[derive(Debug, Clone)]
pub struct MemorySessionRepository {
    backend: MemoryBackend,
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: &Session) -> AppResult<Session> {
        let mut tables = self.backend.lock();
        if tables.sessions.iter().any(|s| s.token == session.token) {
            return Err(AppError::conflict("Session token already exists"));
        }
        tables.sessions.push(session.clone());
        Ok(session.clone())
    }

    async fn find_live_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        Ok(self
            .backend
            .lock()
            .sessions
            .iter()
            .find(|s| s.token == token && s.expires_at > now)
            .cloned())
    }

    async fn replace(&self, old_token: &str, next: &Session) -> AppResult<Session> {
        let mut tables = self.backend.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.token != old_token);
        if tables.sessions.len() == before {
            return Err(AppError::not_found("Session not found"));
        }
        if tables.sessions.iter().any(|s| s.token == next.token) {
            return Err(AppError::conflict("Session token already exists"));
        }
        tables.sessions.push(next.clone());
        Ok(next.clone())
    }

    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        let mut tables = self.backend.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.token != token);
        if tables.sessions.len() == before {
            return Err(AppError::not_found("Session not found"));
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut tables = self.backend.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.user_id != user_id);
        let removed = (before - tables.sessions.len()) as u64;
        if removed == 0 {
            return Err(AppError::not_found(format!(
                "No sessions found for user {user_id}"
            )));
        }
        Ok(removed)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.backend.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.expires_at >= now);
        Ok((before - tables.sessions.len()) as u64)
    }
}
