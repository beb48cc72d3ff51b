//! Services Module
//!
//! Per-domain get-or-fetch facades wired to one shared rate limiter and one
//! shared HTTP transport.
//!
//! # Domains
//! - Geocoding: city name to coordinates (long TTL)
//! - Current weather: conditions at coordinates (short TTL)
//! - Forecast: daily forecast at coordinates (medium TTL)

mod geocoding;
mod weather;

use std::sync::Arc;

use tracing::info;

use crate::cache::TtlCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::ConfigError;
use crate::fetcher::CachedFetcher;
use crate::models::{Language, Units};
use crate::rate_limit::RateLimiter;
use crate::transport::{RetryPolicy, RetryingTransport};

pub use geocoding::GeocodingService;
pub use weather::{WeatherService, MAX_FORECAST_DAYS};

// == Services ==
/// Everything the application needs to look up locations and weather.
///
/// Built once at startup and passed to whoever needs it; clones share state.
#[derive(Clone)]
pub struct Services {
    pub geocoding: GeocodingService,
    pub weather: WeatherService,
    pub limiter: Arc<RateLimiter>,
    /// Units used when a request names none
    pub default_units: Units,
    /// Description language used when a request names none
    pub default_lang: Language,
}

impl Services {
    /// Builds all facades from configuration using the system clock.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds all facades with cache expiry driven by `cache_clock`.
    ///
    /// The rate limiter always runs on the system clock since it has to sleep
    /// in real time.
    pub fn with_clock(config: &Config, cache_clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::from_rate(
            config.rate_limit_events,
            config.rate_limit_window(),
            Arc::new(SystemClock),
        ));
        let transport = RetryingTransport::new(
            config.http_timeout(),
            &config.user_agent,
            RetryPolicy::new(config.retry_total, config.retry_backoff),
        )?;

        let geocoding = GeocodingService::new(
            CachedFetcher::new(
                "geocoding",
                TtlCache::new(config.max_cache_items, cache_clock.clone())?,
                limiter.clone(),
            ),
            transport.clone(),
            config.geocoding_url.clone(),
            config.geocode_ttl(),
        );

        let weather = WeatherService::new(
            CachedFetcher::new(
                "current_weather",
                TtlCache::new(config.max_cache_items, cache_clock.clone())?,
                limiter.clone(),
            ),
            CachedFetcher::new(
                "forecast",
                TtlCache::new(config.max_cache_items, cache_clock)?,
                limiter.clone(),
            ),
            transport,
            config.weather_url.clone(),
            config.weather_ttl(),
            config.forecast_ttl(),
        );

        info!(
            "Services initialized: max_items={}, rate_limit={}/{:?}, retries={}",
            config.max_cache_items,
            limiter.max_events(),
            limiter.window(),
            config.retry_total
        );

        Ok(Self {
            geocoding,
            weather,
            limiter,
            default_units: config.default_units,
            default_lang: config.default_lang,
        })
    }

    // == Maintenance ==
    /// Eagerly purges expired entries from every domain cache.
    pub async fn purge_expired(&self) -> usize {
        self.geocoding.fetcher().purge_expired().await
            + self.weather.current_fetcher().purge_expired().await
            + self.weather.forecast_fetcher().purge_expired().await
    }

    /// Empties every domain cache.
    pub async fn clear(&self) {
        self.geocoding.fetcher().clear().await;
        self.weather.current_fetcher().clear().await;
        self.weather.forecast_fetcher().clear().await;
    }
}
