//! Configuration Module
//!
//! Loads caching, throttling and transport settings from environment variables.
//! Values are read once at startup and never change afterwards.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::{Language, Units};
use crate::rate_limit::scaled_window;

/// Runtime configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Capacity of each domain cache before LRU eviction kicks in
    pub max_cache_items: usize,
    /// Lifetime of geocoding results in seconds
    pub geocode_ttl: u64,
    /// Lifetime of current-weather results in seconds
    pub weather_ttl: u64,
    /// Lifetime of forecast results in seconds
    pub forecast_ttl: u64,
    /// Admitted outbound calls per window; zero or less disables limiting
    pub rate_limit_events: f64,
    /// Width of the rate limiting window in seconds
    pub rate_limit_window: f64,
    /// Per-attempt HTTP timeout in seconds
    pub http_timeout: f64,
    /// Retries after the first attempt
    pub retry_total: u32,
    /// Base backoff delay in seconds
    pub retry_backoff: f64,
    /// Geocoding search endpoint
    pub geocoding_url: String,
    /// Weather forecast endpoint
    pub weather_url: String,
    /// User agent sent upstream
    pub user_agent: String,
    /// Background purge interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Log filter used when RUST_LOG is unset
    pub log_level: String,
    /// Units applied when a request does not name any
    pub default_units: Units,
    /// Weather description language applied when a request does not name one
    pub default_lang: Language,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ADK_MAX_CACHE_ITEMS` - Cache capacity per domain (default: 1000)
    /// - `ADK_GEOCODE_TTL` - Geocoding TTL in seconds (default: 3600)
    /// - `ADK_WEATHER_TTL` - Current weather TTL in seconds (default: 300)
    /// - `ADK_FORECAST_TTL` - Forecast TTL in seconds (default: 900)
    /// - `ADK_RATE_LIMIT_RPS` - Calls per window (default: 5)
    /// - `ADK_RL_WINDOW_SEC` - Window width in seconds (default: 1)
    /// - `ADK_HTTP_TIMEOUT` - Per-attempt timeout in seconds (default: 10)
    /// - `ADK_RETRY_TOTAL` - Retries on transient failure (default: 3)
    /// - `ADK_RETRY_BACKOFF` - Backoff factor in seconds (default: 0.3)
    /// - `ADK_GEOCODING_URL`, `ADK_WEATHER_URL` - Upstream endpoints
    /// - `ADK_USER_AGENT` - User agent (default: WeatherAgent/1.0)
    /// - `ADK_CLEANUP_INTERVAL` - Purge frequency in seconds (default: 60)
    /// - `ADK_PORT` - HTTP server port (default: 3000)
    /// - `ADK_LOG_LEVEL` - Log level (default: info)
    /// - `ADK_UNITS_DEFAULT` - metric or imperial (default: metric)
    /// - `ADK_LANG_DEFAULT` - en or zh (default: en)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_cache_items: env_or("ADK_MAX_CACHE_ITEMS", defaults.max_cache_items),
            geocode_ttl: env_or("ADK_GEOCODE_TTL", defaults.geocode_ttl),
            weather_ttl: env_or("ADK_WEATHER_TTL", defaults.weather_ttl),
            forecast_ttl: env_or("ADK_FORECAST_TTL", defaults.forecast_ttl),
            rate_limit_events: env_or("ADK_RATE_LIMIT_RPS", defaults.rate_limit_events),
            rate_limit_window: env_or("ADK_RL_WINDOW_SEC", defaults.rate_limit_window),
            http_timeout: env_or("ADK_HTTP_TIMEOUT", defaults.http_timeout),
            retry_total: env_or("ADK_RETRY_TOTAL", defaults.retry_total),
            retry_backoff: env_or("ADK_RETRY_BACKOFF", defaults.retry_backoff),
            geocoding_url: env_or("ADK_GEOCODING_URL", defaults.geocoding_url),
            weather_url: env_or("ADK_WEATHER_URL", defaults.weather_url),
            user_agent: env_or("ADK_USER_AGENT", defaults.user_agent),
            cleanup_interval: env_or("ADK_CLEANUP_INTERVAL", defaults.cleanup_interval),
            server_port: env_or("ADK_PORT", defaults.server_port),
            log_level: env_or("ADK_LOG_LEVEL", defaults.log_level).to_lowercase(),
            default_units: env_or("ADK_UNITS_DEFAULT", defaults.default_units),
            default_lang: env_or("ADK_LANG_DEFAULT", defaults.default_lang),
        }
    }

    // == Validate ==
    /// Rejects settings the caching layer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cache_items == 0 {
            return Err(invalid("ADK_MAX_CACHE_ITEMS", "must be at least 1"));
        }
        for (name, ttl) in [
            ("ADK_GEOCODE_TTL", self.geocode_ttl),
            ("ADK_WEATHER_TTL", self.weather_ttl),
            ("ADK_FORECAST_TTL", self.forecast_ttl),
        ] {
            if ttl == 0 {
                return Err(invalid(name, "must be at least 1 second"));
            }
        }
        let window = positive_duration("ADK_RL_WINDOW_SEC", self.rate_limit_window)?;
        positive_duration("ADK_HTTP_TIMEOUT", self.http_timeout)?;
        if self.rate_limit_events > 0.0
            && self.rate_limit_events < 1.0
            && scaled_window(self.rate_limit_events, window).is_none()
        {
            return Err(invalid("ADK_RATE_LIMIT_RPS", "too small for the configured window"));
        }
        if !(self.retry_backoff.is_finite() && self.retry_backoff >= 0.0) {
            return Err(invalid("ADK_RETRY_BACKOFF", "must not be negative"));
        }
        if self.cleanup_interval == 0 {
            return Err(invalid("ADK_CLEANUP_INTERVAL", "must be at least 1 second"));
        }
        Ok(())
    }

    pub fn geocode_ttl(&self) -> Duration {
        Duration::from_secs(self.geocode_ttl)
    }

    pub fn weather_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_ttl)
    }

    pub fn forecast_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_ttl)
    }

    /// Falls back to the default window when unrepresentable; `validate` rejects that case.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.rate_limit_window).unwrap_or(Duration::from_secs(1))
    }

    /// Falls back to the default timeout when unrepresentable; `validate` rejects that case.
    pub fn http_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.http_timeout).unwrap_or(Duration::from_secs(10))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_items: 1000,
            geocode_ttl: 3600,
            weather_ttl: 300,
            forecast_ttl: 900,
            rate_limit_events: 5.0,
            rate_limit_window: 1.0,
            http_timeout: 10.0,
            retry_total: 3,
            retry_backoff: 0.3,
            geocoding_url: "https://nominatim.openstreetmap.org/search".to_string(),
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            user_agent: "WeatherAgent/1.0".to_string(),
            cleanup_interval: 60,
            server_port: 3000,
            log_level: "info".to_string(),
            default_units: Units::Metric,
            default_lang: Language::En,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Seconds that are positive and fit in a `Duration`.
fn positive_duration(name: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(invalid(name, "must be a positive number of seconds")),
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.to_string(),
    }
}
