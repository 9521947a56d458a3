//! Configuration
//! Mission: Env-driven settings with sensible defaults

use std::env;
use std::time::Duration;

/// Runtime settings for the ledger subsystem.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite record store.
    pub database_path: String,
    /// Delay before the integrity monitor's first pass, letting the store
    /// initialize.
    pub monitor_startup_delay: Duration,
    /// Fixed period between integrity checks.
    pub monitor_check_interval: Duration,
    /// Fixed period between backup re-sync passes.
    pub backup_resync_interval: Duration,
    /// Recovery retry budget per loss episode.
    pub max_recovery_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path =
            env::var("LEDGER_DB_PATH").unwrap_or_else(|_| "./tradesim-ledger.db".to_string());

        let monitor_startup_delay = env_secs("LEDGER_MONITOR_STARTUP_DELAY_SECS", 2);
        let monitor_check_interval = env_secs("LEDGER_MONITOR_CHECK_INTERVAL_SECS", 10);
        let backup_resync_interval = env_secs("LEDGER_BACKUP_RESYNC_INTERVAL_SECS", 60);

        let max_recovery_attempts = env::var("LEDGER_MAX_RECOVERY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(5);

        Self {
            database_path,
            monitor_startup_delay,
            monitor_check_interval,
            backup_resync_interval,
            max_recovery_attempts,
        }
    }
}

fn env_secs(var: &str, default_secs: u64) -> Duration {
    let secs = env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Env vars are unset in the test environment, so defaults apply.
        let config = Config::from_env();
        assert_eq!(config.monitor_check_interval, Duration::from_secs(10));
        assert_eq!(config.max_recovery_attempts, 5);
    }
}
