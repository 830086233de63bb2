//! Environment-backed configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Catch-up window, snooze and recurrence defaults
//! - 1.0.0: Initial creation with database path and log level

use anyhow::{Context, Result};

/// Runtime configuration, read once at startup.
///
/// Every knob has a default so the bot runs with an empty environment; the
/// binary loads a `.env` file first via `dotenvy`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file (`DB_PATH`)
    pub database_path: String,
    /// Default log filter for env_logger (`LOG_LEVEL`)
    pub log_level: String,
    /// IANA zone applied when a user has no stored timezone (`TZ`)
    pub default_timezone: String,
    /// Lookahead window for the immediate catch-up fire, minutes (`CATCHUP_WINDOW_MINUTES`)
    pub catchup_window_minutes: i64,
    /// Delay before a catch-up or past-due one-shot fires, seconds (`CATCHUP_GRACE_SECONDS`)
    pub catchup_grace_seconds: u64,
    /// Default snooze delay, minutes (`SNOOZE_MINUTES`)
    pub snooze_minutes: i64,
    /// Recurrence applied when the dialog does not ask (`DEFAULT_RECURRENCE`, `daily` or `once`)
    pub default_recurrence: String,
    /// Whether the custom-time dialog asks for a recurrence choice (`ASK_RECURRENCE`)
    pub ask_recurrence: bool,
    /// Number of fire workers (`FIRE_WORKERS`)
    pub fire_workers: usize,
    /// Capacity of the fire queue (`FIRE_QUEUE_CAPACITY`)
    pub fire_queue_capacity: usize,
}

impl Config {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_path: env_or("DB_PATH", "pillbox.db"),
            log_level: env_or("LOG_LEVEL", "info"),
            default_timezone: env_or("TZ", "Asia/Tashkent"),
            catchup_window_minutes: parse_env("CATCHUP_WINDOW_MINUTES", 10)?,
            catchup_grace_seconds: parse_env("CATCHUP_GRACE_SECONDS", 15)?,
            snooze_minutes: parse_env("SNOOZE_MINUTES", 10)?,
            default_recurrence: env_or("DEFAULT_RECURRENCE", "daily"),
            ask_recurrence: parse_env("ASK_RECURRENCE", false)?,
            fire_workers: parse_env("FIRE_WORKERS", 4)?,
            fire_queue_capacity: parse_env("FIRE_QUEUE_CAPACITY", 64)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: "pillbox.db".to_string(),
            log_level: "info".to_string(),
            default_timezone: "Asia/Tashkent".to_string(),
            catchup_window_minutes: 10,
            catchup_grace_seconds: 15,
            snooze_minutes: 10,
            default_recurrence: "daily".to_string(),
            ask_recurrence: false,
            fire_workers: 4,
            fire_queue_capacity: 64,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.catchup_window_minutes, 10);
        assert_eq!(config.snooze_minutes, 10);
        assert_eq!(config.default_recurrence, "daily");
        assert!(!config.ask_recurrence);
    }
}
