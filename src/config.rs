//! Service configuration, loaded from `PETLOO_*` environment variables.
//!
//! Every setting has a default, so an empty environment yields a working
//! local setup with the demo orders seeded.

use std::time::Duration;

use crate::utils::{CircuitBreakerConfig, RetryConfig};

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Interface both servers bind to.
    pub host: String,
    /// Public API port.
    pub http_port: u16,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 3000,
            metrics_port: 9090,
        }
    }
}

/// Knobs shared by the lookup and photo link services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Artificial wait before each lookup.
    pub simulated_latency: Duration,
    /// Upper bound for a whole service call.
    pub request_timeout: Duration,
    /// Backoff applied to order-store reads.
    pub read_retry: RetryConfig,
    /// Largest accepted photo upload.
    pub max_photo_bytes: usize,
    /// Breaker in front of photo storage.
    pub photo_breaker: CircuitBreakerConfig,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            simulated_latency: Duration::ZERO,
            request_timeout: Duration::from_millis(5000),
            read_retry: RetryConfig::default(),
            max_photo_bytes: 10 * 1024 * 1024,
            photo_breaker: CircuitBreakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    /// How often the relay drains the outbox.
    pub poll_interval: Duration,
    /// Outbox messages handled per poll.
    pub batch_size: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            batch_size: 50,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub service: ServiceSettings,
    pub notifications: NotificationSettings,
    /// Place the demo orders at startup.
    pub seed_fixtures: bool,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to something unparseable or
    /// out of range. Unset variables fall back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let server_defaults = ServerSettings::default();
        let server = ServerSettings {
            host: env
                .string("PETLOO_HTTP_HOST")?
                .unwrap_or(server_defaults.host),
            http_port: env.parse("PETLOO_HTTP_PORT", server_defaults.http_port)?,
            metrics_port: env.parse("PETLOO_METRICS_PORT", server_defaults.metrics_port)?,
        };

        let service_defaults = ServiceSettings::default();
        let read_retry = RetryConfig {
            max_attempts: env.parse(
                "PETLOO_READ_RETRY_ATTEMPTS",
                service_defaults.read_retry.max_attempts,
            )?,
            ..service_defaults.read_retry
        };
        if read_retry.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PETLOO_READ_RETRY_ATTEMPTS".to_string(),
                reason: "at least one attempt is required",
            });
        }

        let service = ServiceSettings {
            simulated_latency: env.millis(
                "PETLOO_SIMULATED_LATENCY_MS",
                service_defaults.simulated_latency,
            )?,
            request_timeout: env.millis(
                "PETLOO_REQUEST_TIMEOUT_MS",
                service_defaults.request_timeout,
            )?,
            read_retry,
            max_photo_bytes: env.parse("PETLOO_MAX_PHOTO_BYTES", service_defaults.max_photo_bytes)?,
            photo_breaker: CircuitBreakerConfig {
                failure_threshold: env.parse(
                    "PETLOO_BREAKER_FAILURE_THRESHOLD",
                    service_defaults.photo_breaker.failure_threshold,
                )?,
                timeout: env.millis("PETLOO_BREAKER_RESET_MS", service_defaults.photo_breaker.timeout)?,
                ..service_defaults.photo_breaker
            },
        };
        if service.request_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "PETLOO_REQUEST_TIMEOUT_MS".to_string(),
                reason: "must be greater than zero",
            });
        }
        if service.photo_breaker.failure_threshold == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PETLOO_BREAKER_FAILURE_THRESHOLD".to_string(),
                reason: "must be greater than zero",
            });
        }
        if service.max_photo_bytes == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PETLOO_MAX_PHOTO_BYTES".to_string(),
                reason: "must be greater than zero",
            });
        }

        let notification_defaults = NotificationSettings::default();
        let notifications = NotificationSettings {
            poll_interval: env.millis("PETLOO_NOTIFY_POLL_MS", notification_defaults.poll_interval)?,
            batch_size: notification_defaults.batch_size,
        };
        if notifications.poll_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "PETLOO_NOTIFY_POLL_MS".to_string(),
                reason: "must be greater than zero",
            });
        }

        let seed_fixtures = env.flag("PETLOO_SEED_FIXTURES", true)?;

        Ok(Self {
            server,
            service,
            notifications,
            seed_fixtures,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue { key: String, value: String },
    /// Environment variable parsed but is not usable.
    #[error("environment variable {key} is out of range: {reason}")]
    OutOfRange { key: String, reason: &'static str },
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match (self.lookup)(key) {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
            Some(value) => Ok(Some(value.trim().to_string())),
        }
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.string(key)? {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        }
    }

    fn millis(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        self.parse(key, default_ms).map(Duration::from_millis)
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.string(key)? {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                }),
            },
        }
    }
}
