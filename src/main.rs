//! Gatehouse server — credential and session lifecycle daemon.
//!
//! Wires configuration, storage, and the background reclaimer
//! together. The HTTP surface embedding the lifecycle manager lives in
//! the consuming application; this binary owns the shared state and
//! the reclamation loops.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use gatehouse_auth::{AccountStore, PasswordHasher, PasswordPolicy, SessionStore};
use gatehouse_core::clock::SystemClock;
use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_database::connection::DatabasePool;
use gatehouse_database::repositories::session::{PgSessionRepository, SessionRepository};
use gatehouse_database::repositories::user::{PgUserRepository, UserRepository};
use gatehouse_reclaimer::Reclaimer;

#[tokio::main]
async fn main() {
    let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Gatehouse v{}", env!("CARGO_PKG_VERSION"));

    // ── Database connection + migrations ─────────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    gatehouse_database::migration::run_migrations(db.pool()).await?;

    // ── Stores ───────────────────────────────────────────────────
    let clock = Arc::new(SystemClock::new());
    let user_repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool().clone()));
    let session_repo: Arc<dyn SessionRepository> =
        Arc::new(PgSessionRepository::new(db.pool().clone()));

    let hasher = Arc::new(PasswordHasher::new());
    let policy = PasswordPolicy::new(&config.auth);
    let accounts = Arc::new(AccountStore::new(user_repo, Arc::clone(&hasher), policy));
    let sessions = Arc::new(SessionStore::new(session_repo));

    // ── Shutdown channel ─────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background reclaimer ─────────────────────────────────────
    let reclaimer = Reclaimer::new(
        Arc::clone(&accounts),
        Arc::clone(&sessions),
        clock,
        config.reclaimer.clone(),
    );

    let reclaimer_handles = if config.reclaimer.enabled {
        let session_sweeper = reclaimer.clone();
        let session_cancel = shutdown_rx.clone();
        let session_handle = tokio::spawn(async move {
            session_sweeper.run_session_sweeps(session_cancel).await;
        });

        let lock_sweeper = reclaimer;
        let lock_cancel = shutdown_rx.clone();
        let lock_handle = tokio::spawn(async move {
            lock_sweeper.run_lock_sweeps(lock_cancel).await;
        });

        tracing::info!("Background reclaimer started");
        Some((session_handle, lock_handle))
    } else {
        tracing::info!("Background reclaimer disabled");
        None
    };

    // ── Graceful shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some((session_handle, lock_handle)) = reclaimer_handles {
        let grace = std::time::Duration::from_secs(config.reclaimer.shutdown_grace_seconds);
        let _ = tokio::time::timeout(grace, session_handle).await;
        let _ = tokio::time::timeout(grace, lock_handle).await;
    }

    db.close().await;
    tracing::info!("Gatehouse shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
