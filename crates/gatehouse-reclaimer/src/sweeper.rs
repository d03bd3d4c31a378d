//! Reclamation sweep loops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{error, info};

use gatehouse_auth::{AccountStore, SessionStore};
use gatehouse_core::clock::Clock;
use gatehouse_core::config::reclaimer::ReclaimerConfig;
use gatehouse_core::result::AppResult;

/// Runs the two reclamation sweeps.
///
/// Each sweep is a single bulk storage operation, idempotent and safe
/// to run concurrently with live request traffic; the store's own
/// transaction discipline is the only serialization.
#[derive(Clone)]
pub struct Reclaimer {
    /// Account operations (lock sweep).
    accounts: Arc<AccountStore>,
    /// Session operations (session sweep).
    sessions: Arc<SessionStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Sweep intervals.
    config: ReclaimerConfig,
}

impl std::fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reclaimer")
            .field("config", &self.config)
            .finish()
    }
}

impl Reclaimer {
    /// Creates a new reclaimer.
    pub fn new(
        accounts: Arc<AccountStore>,
        sessions: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
        config: ReclaimerConfig,
    ) -> Self {
        Self {
            accounts,
            sessions,
            clock,
            config,
        }
    }

    /// Deletes every session whose expiry has passed.
    ///
    /// Returns the number deleted.
    pub async fn sweep_sessions(&self) -> AppResult<u64> {
        let removed = self.sessions.delete_expired(self.clock.now()).await?;
        if removed > 0 {
            info!(removed = removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    /// Releases every account lock whose deadline has passed.
    ///
    /// Returns the number of accounts unlocked.
    pub async fn sweep_locks(&self) -> AppResult<u64> {
        let unlocked = self.accounts.unlock_all_expired(self.clock.now()).await?;
        if unlocked > 0 {
            info!(unlocked = unlocked, "Released expired account locks");
        }
        Ok(unlocked)
    }

    /// Runs the session sweep loop until the cancel signal is received.
    ///
    /// The first sweep runs immediately; after that the loop only
    /// waits between sweeps, so cancellation takes effect promptly
    /// while letting an in-flight sweep finish.
    pub async fn run_session_sweeps(&self, mut cancel: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.session_sweep_interval_seconds);
        info!(interval_seconds = interval.as_secs(), "Session sweep loop started");

        loop {
            if let Err(e) = self.sweep_sessions().await {
                error!(error = %e, "Session sweep failed");
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(interval) => {}
            }
        }

        info!("Session sweep loop stopped");
    }

    /// Runs the lock sweep loop until the cancel signal is received.
    pub async fn run_lock_sweeps(&self, mut cancel: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.lock_sweep_interval_seconds);
        info!(interval_seconds = interval.as_secs(), "Lock sweep loop started");

        loop {
            if let Err(e) = self.sweep_locks().await {
                error!(error = %e, "Lock sweep failed");
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(interval) => {}
            }
        }

        info!("Lock sweep loop stopped");
    }
}
