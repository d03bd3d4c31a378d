//! End-to-end tests for the login/rotate/logout state machine, run
//! against the in-memory stores with a manual clock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use gatehouse_auth::{
    AccountStore, PasswordHasher, PasswordPolicy, SessionManager, SessionStore, TokenIssuer,
};
use gatehouse_core::clock::Clock;
use gatehouse_core::config::auth::AuthConfig;
use gatehouse_core::{AppError, AppResult, ErrorKind};
use gatehouse_database::repositories::session::SessionRepository;
use gatehouse_database::repositories::user::UserRepository;
use gatehouse_entity::session::Session;
use gatehouse_entity::user::AccountPatch;
use gatehouse_test_support::{ManualClock, MemoryBackend};

const STRONG_PASSWORD: &str = "jW3#nV8$qK5!xD2&mZ7_rT4c";
const OTHER_STRONG_PASSWORD: &str = "pB6%tY1@fH9^sL3*vC8+kN5d";

struct Harness {
    clock: Arc<ManualClock>,
    backend: MemoryBackend,
    accounts: Arc<AccountStore>,
    manager: SessionManager,
    config: AuthConfig,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::default());
    let backend = MemoryBackend::new(clock.clone() as Arc<dyn Clock>);

    let config = AuthConfig {
        jwt_secret: "lifecycle-test-secret".to_string(),
        ..AuthConfig::default()
    };

    let user_repo: Arc<dyn UserRepository> = Arc::new(backend.users());
    let session_repo: Arc<dyn SessionRepository> = Arc::new(backend.sessions());

    let hasher = Arc::new(PasswordHasher::new());
    let policy = PasswordPolicy::new(&config);
    let accounts = Arc::new(AccountStore::new(user_repo, Arc::clone(&hasher), policy));
    let sessions = Arc::new(SessionStore::new(session_repo));
    let issuer = Arc::new(TokenIssuer::new(&config, clock.clone() as Arc<dyn Clock>));

    let manager = SessionManager::new(
        Arc::clone(&accounts),
        sessions,
        issuer,
        hasher,
        clock.clone() as Arc<dyn Clock>,
        config.clone(),
    );

    Harness {
        clock,
        backend,
        accounts,
        manager,
        config,
    }
}

#[tokio::test]
async fn register_then_login_yields_live_session() {
    let h = harness();
    let user = h
        .accounts
        .register("alice@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let session = h
        .manager
        .login("alice@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    assert_eq!(session.user_id, user.id);

    let state = h.manager.authenticate(&session.token).await.unwrap();
    assert_eq!(state.user_id(), user.id);
    assert!(!state.rotation_due);

    let refreshed = h.accounts.lookup_by_id(user.id).await.unwrap();
    assert_eq!(refreshed.last_login, Some(h.clock.now()));
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let h = harness();

    for (email, password) in [
        ("", STRONG_PASSWORD),
        ("bob@example.com", ""),
        ("not-an-email", STRONG_PASSWORD),
        ("bob@example.com", "password"),
    ] {
        let err = h.accounts.register(email, password).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{email:?}/{password:?}");
    }

    let long_local = "a".repeat(250);
    let err = h
        .accounts
        .register(&format!("{long_local}@example.com"), STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let h = harness();
    h.accounts
        .register("carol@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let err = h
        .accounts
        .register("carol@example.com", OTHER_STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn wrong_password_counts_one_failure_and_no_session() {
    let h = harness();
    let user = h
        .accounts
        .register("dave@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let err = h
        .manager
        .login("dave@example.com", "wrong-password-entirely")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let refreshed = h.accounts.lookup_by_id(user.id).await.unwrap();
    assert_eq!(refreshed.failed_login_attempts, 1);
    assert!(!refreshed.account_locked);
    assert_eq!(h.backend.session_count(), 0);
}

#[tokio::test]
async fn unknown_email_is_unauthorized_not_not_found() {
    let h = harness();
    let err = h
        .manager
        .login("nobody@example.com", STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn lockout_scenario_end_to_end() {
    let h = harness();
    let user = h
        .accounts
        .register("eve@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    for _ in 0..h.config.max_failed_attempts {
        let err = h
            .manager
            .login("eve@example.com", "wrong-password-entirely")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    let locked = h.accounts.lookup_by_id(user.id).await.unwrap();
    assert!(locked.account_locked);
    assert!(locked.account_locked_until.is_some());

    // Correct password still refused while the lock holds.
    let err = h
        .manager
        .login("eve@example.com", STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    // Once the lockout window elapses, login succeeds and the counter
    // resets.
    h.clock
        .advance(Duration::minutes(h.config.lockout_duration_minutes as i64));
    h.manager
        .login("eve@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let unlocked = h.accounts.lookup_by_id(user.id).await.unwrap();
    assert!(!unlocked.account_locked);
    assert!(unlocked.account_locked_until.is_none());
    assert_eq!(unlocked.failed_login_attempts, 0);
}

#[tokio::test]
async fn explicit_unlock_restores_login() {
    let h = harness();
    let user = h
        .accounts
        .register("frank@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    for _ in 0..h.config.max_failed_attempts {
        let _ = h
            .manager
            .login("frank@example.com", "wrong-password-entirely")
            .await;
    }
    assert!(h.accounts.lookup_by_id(user.id).await.unwrap().account_locked);

    h.accounts.unlock(user.id).await.unwrap();

    h.manager
        .login("frank@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn lockout_bookkeeping_on_missing_user_is_not_found() {
    let h = harness();
    let ghost = Uuid::new_v4();
    let deadline = h.clock.now() + Duration::minutes(15);

    let err = h.accounts.increment_failed_logins(ghost).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = h.accounts.reset_failed_logins(ghost).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = h.accounts.lock(ghost, deadline).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = h.accounts.unlock(ghost).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn authenticate_flags_rotation_past_half_life() {
    let h = harness();
    h.accounts
        .register("grace@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let session = h
        .manager
        .login("grace@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let half = Duration::seconds(h.config.session_ttl_seconds as i64 / 2);

    h.clock.advance(half);
    let state = h.manager.authenticate(&session.token).await.unwrap();
    assert!(!state.rotation_due, "exactly at the midpoint is not due");

    h.clock.advance(Duration::seconds(1));
    let state = h.manager.authenticate(&session.token).await.unwrap();
    assert!(state.rotation_due);
}

#[tokio::test]
async fn rotation_kills_old_token_and_keeps_owner() {
    let h = harness();
    let user = h
        .accounts
        .register("heidi@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let old = h
        .manager
        .login("heidi@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    h.clock.advance(Duration::hours(1));
    let next = h.manager.rotate(&old.token).await.unwrap();

    assert_eq!(next.user_id, user.id);
    assert!(next.created_at > old.created_at);
    assert!(next.expires_at > old.expires_at);
    assert_ne!(next.token, old.token);

    let err = h.manager.authenticate(&old.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    h.manager.authenticate(&next.token).await.unwrap();

    // Exactly one live session remains.
    assert_eq!(h.backend.session_count(), 1);
}

#[tokio::test]
async fn rotating_a_dead_token_is_unauthorized() {
    let h = harness();
    h.accounts
        .register("ivan@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let session = h
        .manager
        .login("ivan@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    h.manager.logout(&session.token).await.unwrap();
    let err = h.manager.rotate(&session.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
    let h = harness();
    h.accounts
        .register("judy@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let session = h
        .manager
        .login("judy@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    h.clock
        .advance(Duration::seconds(h.config.session_ttl_seconds as i64));

    let err = h.manager.authenticate(&session.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn logout_twice_surfaces_not_found() {
    let h = harness();
    h.accounts
        .register("mallory@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let session = h
        .manager
        .login("mallory@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    h.manager.logout(&session.token).await.unwrap();
    let err = h.manager.logout(&session.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn logout_everywhere_removes_all_devices() {
    let h = harness();
    let user = h
        .accounts
        .register("nina@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let a = h
        .manager
        .login("nina@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let b = h
        .manager
        .login("nina@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let removed = h.manager.logout_everywhere(user.id).await.unwrap();
    assert_eq!(removed, 2);

    for token in [&a.token, &b.token] {
        let err = h.manager.authenticate(token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}

#[tokio::test]
async fn account_update_rehashes_password_and_invalidates_nothing() {
    let h = harness();
    let user = h
        .accounts
        .register("oscar@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let patch = AccountPatch {
        email: None,
        password: Some(OTHER_STRONG_PASSWORD.to_string()),
    };
    h.accounts.update(user.id, &patch).await.unwrap();

    let err = h
        .manager
        .login("oscar@example.com", STRONG_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    h.manager
        .login("oscar@example.com", OTHER_STRONG_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_update_is_no_changes() {
    let h = harness();
    let user = h
        .accounts
        .register("peggy@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let err = h
        .accounts
        .update(user.id, &AccountPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoChanges);
}

#[tokio::test]
async fn permanent_delete_cascades_to_sessions() {
    let h = harness();
    let user = h
        .accounts
        .register("quinn@example.com", STRONG_PASSWORD)
        .await
        .unwrap();
    let session = h
        .manager
        .login("quinn@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    h.accounts.permanently_delete(user.id).await.unwrap();

    assert_eq!(h.backend.session_count(), 0);
    let err = h.manager.authenticate(&session.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let err = h.accounts.lookup_by_id(user.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

/// A session repository whose storage has gone away entirely.
#[derive(Debug)]
struct UnreachableSessionRepository;

#[async_trait]
impl SessionRepository for UnreachableSessionRepository {
    async fn create(&self, _session: &Session) -> AppResult<Session> {
        Err(AppError::database("connection refused"))
    }

    async fn find_live_by_token(
        &self,
        _token: &str,
        _now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        Err(AppError::database("connection refused"))
    }

    async fn replace(&self, _old_token: &str, _next: &Session) -> AppResult<Session> {
        Err(AppError::database("connection refused"))
    }

    async fn delete_by_token(&self, _token: &str) -> AppResult<()> {
        Err(AppError::database("connection refused"))
    }

    async fn delete_all_for_user(&self, _user_id: Uuid) -> AppResult<u64> {
        Err(AppError::database("connection refused"))
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        Err(AppError::database("connection refused"))
    }
}

#[tokio::test]
async fn storage_outage_is_not_mistaken_for_a_dead_session() {
    let clock = Arc::new(ManualClock::default());
    let backend = MemoryBackend::new(clock.clone() as Arc<dyn Clock>);
    let config = AuthConfig {
        jwt_secret: "lifecycle-test-secret".to_string(),
        ..AuthConfig::default()
    };

    let user_repo: Arc<dyn UserRepository> = Arc::new(backend.users());
    let session_repo: Arc<dyn SessionRepository> = Arc::new(UnreachableSessionRepository);

    let hasher = Arc::new(PasswordHasher::new());
    let policy = PasswordPolicy::new(&config);
    let accounts = Arc::new(AccountStore::new(user_repo, Arc::clone(&hasher), policy));
    let sessions = Arc::new(SessionStore::new(session_repo));
    let issuer = Arc::new(TokenIssuer::new(&config, clock.clone() as Arc<dyn Clock>));

    let manager = SessionManager::new(
        accounts,
        sessions,
        Arc::clone(&issuer),
        hasher,
        clock as Arc<dyn Clock>,
        config,
    );

    // The token itself is valid; only the session storage is down.
    let issued = issuer.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

    let err = manager.authenticate(&issued.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);

    let err = manager.rotate(&issued.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}

#[tokio::test]
async fn profile_projection_has_no_secrets() {
    let h = harness();
    let user = h
        .accounts
        .register("ruth@example.com", STRONG_PASSWORD)
        .await
        .unwrap();

    let profile = h.accounts.profile(user.id).await.unwrap();
    assert_eq!(profile.email, "ruth@example.com");
    assert!(profile.last_login.is_none());
}
