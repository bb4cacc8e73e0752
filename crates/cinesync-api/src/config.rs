//! Server configuration read from the environment at startup.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use cinesync_rooms::application::retry::RetryPolicy;
use cinesync_rooms::application::room_store::RoomStoreConfig;
use cinesync_rooms::domain::aggregates::{PlaybackPolicy, RoomSettings};

use crate::error::AppError;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default database pool size.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
/// Default capacity of newly created rooms.
pub const DEFAULT_ROOM_CAPACITY: usize = 10;
/// Default idle time before a cached room is evicted, in seconds.
pub const DEFAULT_ROOM_IDLE_TTL_SECS: u64 = 1800;
/// Default eviction sweep period, in seconds.
pub const DEFAULT_ROOM_EVICTION_INTERVAL_SECS: u64 = 60;
/// Default bounded wait for the per-room exclusion, in milliseconds.
pub const DEFAULT_ROOM_LOCK_TIMEOUT_MS: u64 = 5000;
/// Default attempts for repository calls.
pub const DEFAULT_PERSIST_RETRY_ATTEMPTS: u32 = 3;
/// Default first retry delay, in milliseconds.
pub const DEFAULT_PERSIST_RETRY_BASE_MS: u64 = 50;
/// Default retry delay cap, in milliseconds.
pub const DEFAULT_PERSIST_RETRY_MAX_MS: u64 = 1000;
/// Default number of chat messages in a sync snapshot.
pub const DEFAULT_MESSAGE_HISTORY_LIMIT: usize = 50;
/// Default WebSocket ping period, in seconds.
pub const DEFAULT_GATEWAY_HEARTBEAT_SECS: u64 = 15;

/// Everything the server reads from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Database pool size.
    pub database_max_connections: u32,
    /// Settings stamped on new rooms.
    pub room_settings: RoomSettings,
    /// Idle time before a cached room is evicted.
    pub room_idle_ttl: Duration,
    /// Eviction sweep period.
    pub room_eviction_interval: Duration,
    /// Bounded wait for the per-room exclusion.
    pub room_lock_timeout: Duration,
    /// Retry policy for repository calls.
    pub retry: RetryPolicy,
    /// Chat messages included in a sync snapshot.
    pub message_history_limit: usize,
    /// WebSocket ping period.
    pub heartbeat_interval: Duration,
    /// Origins allowed by CORS. Empty means any origin.
    pub cors_allowed_origins: Vec<HeaderValue>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the raw value
    /// of a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".into())
            })?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let database_max_connections = parse_var(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;

        let capacity = parse_var(&lookup, "ROOM_CAPACITY", DEFAULT_ROOM_CAPACITY)?;
        if capacity == 0 {
            return Err(AppError::Config("ROOM_CAPACITY must be at least 1".into()));
        }
        let playback_policy = match lookup("PLAYBACK_POLICY").as_deref().map(str::trim) {
            None | Some("owner") => PlaybackPolicy::OwnerOnly,
            Some("any") => PlaybackPolicy::AnyViewer,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "PLAYBACK_POLICY must be `owner` or `any`, got `{other}`"
                )));
            }
        };

        let room_idle_ttl = Duration::from_secs(parse_var(
            &lookup,
            "ROOM_IDLE_TTL_SECS",
            DEFAULT_ROOM_IDLE_TTL_SECS,
        )?);
        let eviction_secs = parse_var(
            &lookup,
            "ROOM_EVICTION_INTERVAL_SECS",
            DEFAULT_ROOM_EVICTION_INTERVAL_SECS,
        )?;
        if eviction_secs == 0 {
            return Err(AppError::Config(
                "ROOM_EVICTION_INTERVAL_SECS must be at least 1".into(),
            ));
        }
        let room_lock_timeout = Duration::from_millis(parse_var(
            &lookup,
            "ROOM_LOCK_TIMEOUT_MS",
            DEFAULT_ROOM_LOCK_TIMEOUT_MS,
        )?);
        let retry = RetryPolicy {
            max_attempts: parse_var(
                &lookup,
                "PERSIST_RETRY_ATTEMPTS",
                DEFAULT_PERSIST_RETRY_ATTEMPTS,
            )?,
            initial_backoff: Duration::from_millis(parse_var(
                &lookup,
                "PERSIST_RETRY_BASE_MS",
                DEFAULT_PERSIST_RETRY_BASE_MS,
            )?),
            max_backoff: Duration::from_millis(parse_var(
                &lookup,
                "PERSIST_RETRY_MAX_MS",
                DEFAULT_PERSIST_RETRY_MAX_MS,
            )?),
        };
        let message_history_limit = parse_var(
            &lookup,
            "MESSAGE_HISTORY_LIMIT",
            DEFAULT_MESSAGE_HISTORY_LIMIT,
        )?;
        let heartbeat_secs = parse_var(
            &lookup,
            "GATEWAY_HEARTBEAT_SECS",
            DEFAULT_GATEWAY_HEARTBEAT_SECS,
        )?;
        if heartbeat_secs == 0 {
            return Err(AppError::Config(
                "GATEWAY_HEARTBEAT_SECS must be at least 1".into(),
            ));
        }

        let cors_allowed_origins = parse_origins(lookup("CORS_ALLOWED_ORIGINS").as_deref())?;

        Ok(Self {
            database_url,
            host,
            port,
            database_max_connections,
            room_settings: RoomSettings {
                capacity,
                playback_policy,
            },
            room_idle_ttl,
            room_eviction_interval: Duration::from_secs(eviction_secs),
            room_lock_timeout,
            retry,
            message_history_limit,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            cors_allowed_origins,
        })
    }

    /// Room store tunables derived from this configuration.
    #[must_use]
    pub fn store_config(&self) -> RoomStoreConfig {
        RoomStoreConfig {
            idle_ttl: self.room_idle_ttl,
            lock_timeout: self.room_lock_timeout,
            retry: self.retry,
            playback_policy: self.room_settings.playback_policy,
        }
    }
}

fn parse_origins(raw: Option<&str>) -> Result<Vec<HeaderValue>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                AppError::Config(format!("CORS_ALLOWED_ORIGINS entry `{origin}` is invalid: {e}"))
            })
        })
        .collect()
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} is invalid: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        // Act
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/cinesync")]).unwrap();

        // Assert
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.room_settings, RoomSettings::default());
        assert_eq!(config.room_idle_ttl, Duration::from_secs(1800));
        assert_eq!(config.room_lock_timeout, Duration::from_secs(5));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.message_history_limit, 50);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        // Act
        let result = config_from(&[("PORT", "8080")]);

        // Assert
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_overrides_are_parsed() {
        // Act
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/cinesync"),
            ("PORT", "8080"),
            ("ROOM_CAPACITY", "4"),
            ("PLAYBACK_POLICY", "any"),
            ("ROOM_LOCK_TIMEOUT_MS", "250"),
            ("PERSIST_RETRY_ATTEMPTS", "5"),
        ])
        .unwrap();

        // Assert
        assert_eq!(config.port, 8080);
        assert_eq!(config.room_settings.capacity, 4);
        assert_eq!(
            config.room_settings.playback_policy,
            PlaybackPolicy::AnyViewer
        );
        assert_eq!(config.store_config().lock_timeout, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        // Act
        let result = config_from(&[("DATABASE_URL", "postgres://db"), ("PORT", "not-a-port")]);

        // Assert
        let Err(AppError::Config(message)) = result else {
            panic!("expected a config error");
        };
        assert!(message.contains("PORT"));
    }

    #[test]
    fn test_unknown_playback_policy_is_rejected() {
        // Act
        let result = config_from(&[("DATABASE_URL", "postgres://db"), ("PLAYBACK_POLICY", "host")]);

        // Assert
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        // Act
        let result = config_from(&[("DATABASE_URL", "postgres://db"), ("ROOM_CAPACITY", "0")]);

        // Assert
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_eviction_interval_is_rejected() {
        // Act
        let result = config_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("ROOM_EVICTION_INTERVAL_SECS", "0"),
        ]);

        // Assert
        let Err(AppError::Config(message)) = result else {
            panic!("expected a config error");
        };
        assert!(message.contains("ROOM_EVICTION_INTERVAL_SECS"));
    }

    #[test]
    fn test_zero_heartbeat_is_rejected() {
        // Act
        let result = config_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("GATEWAY_HEARTBEAT_SECS", "0"),
        ]);

        // Assert
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_cors_origins_are_split_and_trimmed() {
        // Act
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db"),
            (
                "CORS_ALLOWED_ORIGINS",
                "https://watch.example.com, https://admin.example.com,",
            ),
        ])
        .unwrap();

        // Assert
        assert_eq!(
            config.cors_allowed_origins,
            vec![
                HeaderValue::from_static("https://watch.example.com"),
                HeaderValue::from_static("https://admin.example.com"),
            ]
        );
    }

    #[test]
    fn test_cors_origins_default_to_empty() {
        // Act
        let config = config_from(&[("DATABASE_URL", "postgres://db")]).unwrap();

        // Assert
        assert!(config.cors_allowed_origins.is_empty());
    }
}
