//! Background reclaimer configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the two periodic reclamation sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimerConfig {
    /// Whether the reclaimer is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in seconds between expired-session sweeps.
    #[serde(default = "default_session_sweep")]
    pub session_sweep_interval_seconds: u64,
    /// Interval in seconds between expired-lock sweeps.
    #[serde(default = "default_lock_sweep")]
    pub lock_sweep_interval_seconds: u64,
    /// Seconds to wait for an in-flight sweep on shutdown before
    /// force-terminating.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_sweep_interval_seconds: default_session_sweep(),
            lock_sweep_interval_seconds: default_lock_sweep(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_session_sweep() -> u64 {
    900
}

fn default_lock_sweep() -> u64 {
    300
}

fn default_shutdown_grace() -> u64 {
    30
}
