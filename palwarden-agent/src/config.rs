use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file path
    /// Env: DATABASE_PATH (default: "palwarden.db")
    pub database_path: String,

    /// Roster poll interval in seconds
    /// Env: PRESENCE_INTERVAL_SECS (default: 30)
    pub presence_interval: Duration,

    /// Null-ID sweep interval in seconds
    /// Env: SWEEP_INTERVAL_SECS (default: 10)
    pub sweep_interval: Duration,

    /// Log tailing interval in seconds
    /// Env: TAIL_INTERVAL_SECS (default: 8)
    pub tail_interval: Duration,

    /// Status display refresh interval in seconds
    /// Env: STATUS_INTERVAL_SECS (default: 180)
    pub status_interval: Duration,

    /// Delay between successive chat relay posts in milliseconds
    /// Env: CHAT_PACE_MS (default: 1000)
    pub chat_pace: Duration,

    /// Webhook for presence and status notifications
    /// Env: EVENTS_WEBHOOK_URL (optional)
    pub events_webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        Self {
            database_path: env_or_default_string("DATABASE_PATH", "palwarden.db"),
            presence_interval: Duration::from_secs(env_or_default("PRESENCE_INTERVAL_SECS", 30)),
            sweep_interval: Duration::from_secs(env_or_default("SWEEP_INTERVAL_SECS", 10)),
            tail_interval: Duration::from_secs(env_or_default("TAIL_INTERVAL_SECS", 8)),
            status_interval: Duration::from_secs(env_or_default("STATUS_INTERVAL_SECS", 180)),
            chat_pace: Duration::from_millis(env_or_default("CHAT_PACE_MS", 1000)),
            events_webhook_url: var("EVENTS_WEBHOOK_URL").ok(),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            database_path: "palwarden.db".to_string(),
            presence_interval: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
            tail_interval: Duration::from_secs(8),
            status_interval: Duration::from_secs(180),
            chat_pace: Duration::from_millis(1000),
            events_webhook_url: None,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, "palwarden.db");
        assert_eq!(config.presence_interval, Duration::from_secs(30));
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
        assert_eq!(config.tail_interval, Duration::from_secs(8));
        assert_eq!(config.status_interval, Duration::from_secs(180));
        assert_eq!(config.chat_pace, Duration::from_millis(1000));
        assert!(config.events_webhook_url.is_none());
    }
}
