// Server configuration
//
// Loaded from environment variables (after dotenvy has read .env, if present).

use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use ripple_core::live::{
    LiveConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_LAG_STRIKES,
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL URL; None runs the in-memory dev store
    pub database_url: Option<String>,
    pub bind_addr: String,
    /// Prefix for /v1 routes, e.g. "/api"
    pub api_prefix: String,
    pub cors_allowed_origins: Vec<String>,
    pub run_migrations: bool,
    pub analytics_sweep_interval: Duration,
    pub live: LiveConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_prefix: String::new(),
            cors_allowed_origins: Vec::new(),
            run_migrations: true,
            analytics_sweep_interval: DEFAULT_SWEEP_INTERVAL,
            live: LiveConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `DATABASE_URL`: PostgreSQL URL (unset: in-memory dev mode)
    /// - `BIND_ADDR`: listen address (default: 0.0.0.0:9000)
    /// - `API_PREFIX`: route prefix (default: empty)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated origins (default: none)
    /// - `STREAM_HEARTBEAT_SECS`: live heartbeat interval (default: 30)
    /// - `STREAM_CHANNEL_CAPACITY`: per-user live buffer (default: 256)
    /// - `STREAM_MAX_LAG_STRIKES`: lag events before a reader is dropped (default: 3)
    /// - `ANALYTICS_SWEEP_SECS`: aggregator sweep interval (default: 60)
    /// - `RUN_MIGRATIONS`: apply migrations on Postgres startup (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as from_env, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = non_empty("DATABASE_URL");
        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let api_prefix = non_empty("API_PREFIX").unwrap_or_default();

        let cors_allowed_origins = non_empty("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let run_migrations = non_empty("RUN_MIGRATIONS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true);

        let heartbeat_secs = parse_or(
            &lookup,
            "STREAM_HEARTBEAT_SECS",
            DEFAULT_HEARTBEAT_INTERVAL.as_secs(),
        );
        let channel_capacity =
            parse_or(&lookup, "STREAM_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY);
        let max_lag_strikes = parse_or(&lookup, "STREAM_MAX_LAG_STRIKES", DEFAULT_MAX_LAG_STRIKES);
        let sweep_secs = parse_or(
            &lookup,
            "ANALYTICS_SWEEP_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        );

        Self {
            database_url,
            bind_addr,
            api_prefix,
            cors_allowed_origins,
            run_migrations,
            analytics_sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            live: LiveConfig::default()
                .with_heartbeat_interval(Duration::from_secs(heartbeat_secs.max(1)))
                .with_channel_capacity(channel_capacity)
                .with_max_lag_strikes(max_lag_strikes),
        }
    }

    /// Origins that parse as header values; the rest are skipped
    pub fn cors_origins(&self) -> Vec<HeaderValue> {
        self.cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect()
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert!(config.api_prefix.is_empty());
        assert!(config.run_migrations);
        assert_eq!(config.analytics_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.live.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.live.channel_capacity, 256);
        assert_eq!(config.live.max_lag_strikes, 3);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ripple"),
            ("API_PREFIX", "/api"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com,"),
            ("STREAM_HEARTBEAT_SECS", "5"),
            ("STREAM_MAX_LAG_STRIKES", "1"),
            ("RUN_MIGRATIONS", "false"),
        ]);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/ripple")
        );
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.cors_origins().len(), 2);
        assert_eq!(config.live.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.live.max_lag_strikes, 1);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("STREAM_CHANNEL_CAPACITY", "lots"), ("DATABASE_URL", " ")]);
        assert_eq!(config.live.channel_capacity, 256);
        assert!(config.database_url.is_none());
    }
}
