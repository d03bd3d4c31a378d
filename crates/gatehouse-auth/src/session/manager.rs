//! Session lifecycle manager — login, authenticate, rotate, logout.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_core::clock::Clock;
use gatehouse_core::config::auth::AuthConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::session::Session;
use gatehouse_entity::user::User;

use crate::account::AccountStore;
use crate::password::PasswordHasher;
use crate::token::TokenIssuer;

use super::store::SessionStore;

/// Result of a successful token authentication.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The live session behind the presented token.
    pub session: Session,
    /// Whether the session is past the halfway point of its lifetime
    /// and should be rotated before the response completes.
    pub rotation_due: bool,
}

impl AuthState {
    /// The authenticated subject.
    pub fn user_id(&self) -> Uuid {
        self.session.user_id
    }
}

/// Orchestrates the login/rotate/logout state machine over the account
/// and session stores.
///
/// The manager owns neither store's records; it coordinates both under
/// single logical operations and maps every authentication failure to
/// a uniform unauthorized signal so callers cannot distinguish a bad
/// password from a missing account or a dead session.
#[derive(Clone)]
pub struct SessionManager {
    /// Account operations.
    accounts: Arc<AccountStore>,
    /// Session persistence.
    sessions: Arc<SessionStore>,
    /// Token signing and verification.
    issuer: Arc<TokenIssuer>,
    /// Password verification.
    hasher: Arc<PasswordHasher>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Auth configuration.
    config: AuthConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    pub fn new(
        accounts: Arc<AccountStore>,
        sessions: Arc<SessionStore>,
        issuer: Arc<TokenIssuer>,
        hasher: Arc<PasswordHasher>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            accounts,
            sessions,
            issuer,
            hasher,
            clock,
            config,
        }
    }

    /// Performs the complete login flow:
    ///
    /// 1. Look up the account
    /// 2. Refuse if locked, without touching the password
    /// 3. Verify the password; on mismatch, count the failure and lock
    ///    at the configured threshold
    /// 4. Issue a token and persist the session
    ///
    /// Lockout transitions commit even though the login itself fails.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        if email.is_empty() {
            return Err(AppError::validation("Email must not be empty"));
        }
        if password.is_empty() {
            return Err(AppError::validation("Password must not be empty"));
        }

        let user = match self.accounts.lookup_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.kind == ErrorKind::NotFound => {
                return Err(AppError::unauthorized("Invalid email or password"));
            }
            Err(e) => return Err(e),
        };

        let now = self.clock.now();

        if user.is_locked(now) {
            warn!(user_id = %user.id, "Login refused for locked account");
            return Err(AppError::unauthorized("Account is temporarily locked"));
        }

        let password_valid = self.hasher.verify_password(password, &user.password_hash)?;
        if !password_valid {
            self.handle_failed_login(&user).await?;
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        // A lapsed lock clears itself on the first successful login.
        if user.account_locked {
            self.accounts.unlock(user.id).await?;
        } else if user.failed_login_attempts > 0 {
            self.accounts.reset_failed_logins(user.id).await?;
        }

        self.accounts.record_login(user.id, now).await?;

        let session = self.open_session(user.id).await?;
        info!(user_id = %user.id, session_id = %session.id, "Login successful");
        Ok(session)
    }

    /// Authenticates a bearer token.
    ///
    /// Both the token's own signed expiry and the persisted session
    /// must be valid; a verified token whose session row is gone is
    /// unauthorized, never a stale success.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthState> {
        let claims = self.issuer.verify(token)?;

        let now = self.clock.now();
        let session = self.lookup_live_session(token, now).await?;

        if session.user_id != claims.sub {
            return Err(AppError::unauthorized("Invalid or expired session"));
        }

        let rotation_due = session.rotation_due(now);
        Ok(AuthState {
            session,
            rotation_due,
        })
    }

    /// Replaces an aging session with a fresh one.
    ///
    /// The old session's deletion and the new session's insertion are
    /// one atomic storage unit; after this returns, the old token is
    /// dead regardless of its own expiry claim.
    pub async fn rotate(&self, old_token: &str) -> AppResult<Session> {
        let now = self.clock.now();
        let old = self.lookup_live_session(old_token, now).await?;

        let next = self.mint_session(old.user_id)?;
        let created = match self.sessions.replace(old_token, &next).await {
            Ok(created) => created,
            Err(e) if e.kind == ErrorKind::NotFound => {
                // Lost the race with a concurrent rotation or logout.
                return Err(AppError::unauthorized("Invalid or expired session"));
            }
            Err(e) => return Err(e),
        };

        info!(
            user_id = %created.user_id,
            old_session_id = %old.id,
            session_id = %created.id,
            "Session rotated"
        );
        Ok(created)
    }

    /// Ends the session behind the given token.
    ///
    /// A not-found from the store passes through; logging out an
    /// already-removed session is signalled, not masked.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.delete_by_token(token).await?;
        info!("Logout completed");
        Ok(())
    }

    /// Ends every session for the given account, across all devices.
    pub async fn logout_everywhere(&self, user_id: Uuid) -> AppResult<u64> {
        let removed = self.sessions.delete_all_for_user(user_id).await?;
        info!(user_id = %user_id, removed = removed, "Logged out everywhere");
        Ok(removed)
    }

    /// Looks up the live session behind a token.
    ///
    /// A missing, expired, or malformed-token session is the uniform
    /// unauthorized signal; storage failures are surfaced as-is so an
    /// outage never reads as an invalid session.
    async fn lookup_live_session(&self, token: &str, now: DateTime<Utc>) -> AppResult<Session> {
        match self.sessions.get_live_by_token(token, now).await {
            Ok(session) => Ok(session),
            Err(e) if matches!(e.kind, ErrorKind::NotFound | ErrorKind::Validation) => {
                Err(AppError::unauthorized("Invalid or expired session"))
            }
            Err(e) => Err(e),
        }
    }

    /// Counts a failed password attempt, locking the account once the
    /// configured threshold is reached.
    async fn handle_failed_login(&self, user: &User) -> AppResult<()> {
        let attempts = self.accounts.increment_failed_logins(user.id).await?;

        if attempts >= self.config.max_failed_attempts {
            let until =
                self.clock.now() + Duration::minutes(self.config.lockout_duration_minutes as i64);
            self.accounts.lock(user.id, until).await?;
            warn!(
                user_id = %user.id,
                attempts = attempts,
                locked_until = %until,
                "Account locked after repeated failed logins"
            );
        }

        Ok(())
    }

    /// Mints a token and builds the session record binding it.
    fn mint_session(&self, user_id: Uuid) -> AppResult<Session> {
        let ttl = Duration::seconds(self.config.session_ttl_seconds as i64);
        let issued = self.issuer.issue(user_id, ttl)?;
        Session::new(user_id, issued.token, issued.issued_at, issued.expires_at)
    }

    /// Mints and persists a fresh session.
    async fn open_session(&self, user_id: Uuid) -> AppResult<Session> {
        let session = self.mint_session(user_id)?;
        self.sessions.create(&session).await
    }
}
