//! Response DTOs for the lookup and diagnostics API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::fetcher::FetchStats;
use crate::models::{Coordinates, CurrentWeather, Forecast, Language, Units};

/// Response body for `GET /geocode/:city`
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeResponse {
    pub city: String,
    pub coordinates: Coordinates,
}

/// Response body for `GET /weather/:city`
#[derive(Debug, Clone, Serialize)]
pub struct WeatherResponse {
    pub city: String,
    pub coordinates: Coordinates,
    pub units: Units,
    pub lang: Language,
    pub current: CurrentWeather,
    /// Readable form of `current.weathercode`
    pub description: String,
}

impl WeatherResponse {
    pub fn new(
        city: String,
        coordinates: Coordinates,
        units: Units,
        lang: Language,
        current: CurrentWeather,
    ) -> Self {
        let description = current.description(lang);
        Self {
            city,
            coordinates,
            units,
            lang,
            current,
            description,
        }
    }
}

/// Response body for `GET /forecast/:city`
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResponse {
    pub city: String,
    pub coordinates: Coordinates,
    pub units: Units,
    pub lang: Language,
    pub forecast: Forecast,
    /// One description per day, aligned with `forecast.daily.time`
    pub descriptions: Vec<String>,
}

impl ForecastResponse {
    pub fn new(
        city: String,
        coordinates: Coordinates,
        units: Units,
        lang: Language,
        forecast: Forecast,
    ) -> Self {
        let descriptions = forecast.descriptions(lang);
        Self {
            city,
            coordinates,
            units,
            lang,
            forecast,
            descriptions,
        }
    }
}

/// Cache and fetch counters for one data domain.
#[derive(Debug, Clone, Serialize)]
pub struct DomainStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub total_entries: usize,
    /// Hit rate as a percentage (0-100)
    pub hit_rate: f64,
    pub fetches: u64,
    pub failures: u64,
    pub coalesced: u64,
}

impl DomainStats {
    pub fn new(cache: &CacheStats, fetch: &FetchStats) -> Self {
        Self {
            hits: cache.hits,
            misses: cache.misses,
            expirations: cache.expirations,
            evictions: cache.evictions,
            total_entries: cache.total_entries,
            hit_rate: cache.hit_rate() * 100.0,
            fetches: fetch.fetches,
            failures: fetch.failures,
            coalesced: fetch.coalesced,
        }
    }
}

/// Rate limiter occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    pub max_events: usize,
    pub window_secs: f64,
    pub in_window: usize,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub geocoding: DomainStats,
    pub current_weather: DomainStats,
    pub forecast: DomainStats,
    pub rate_limiter: LimiterStats,
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "All caches cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for the health check endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    /// Creates a healthy status response stamped with the current time
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}
