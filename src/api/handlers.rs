//! API Handlers
//!
//! HTTP request handlers for the lookup and diagnostics endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::models::{
    ClearResponse, DomainStats, ForecastQuery, ForecastResponse, GeocodeResponse, HealthResponse,
    LimiterStats, StatsResponse, WeatherQuery, WeatherResponse,
};
use crate::services::Services;

/// Application state shared across all handlers.
///
/// Holds the facades; every clone shares the same caches and limiter.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    /// Creates a new AppState around already-built services.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(Services::from_config(config)?))
    }
}

/// Handler for GET /geocode/:city
pub async fn geocode_handler(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<GeocodeResponse>> {
    let coordinates = state.services.geocoding.coordinates(&city).await?;

    Ok(Json(GeocodeResponse { city, coordinates }))
}

/// Handler for GET /weather/:city
///
/// Geocodes the city, then looks up current conditions. Both steps go
/// through their own cache.
pub async fn weather_handler(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>> {
    let services = &state.services;
    let units = query.units.unwrap_or(services.default_units);
    let lang = query.lang.unwrap_or(services.default_lang);

    let coordinates = services.geocoding.coordinates(&city).await?;
    let current = services.weather.current(coordinates, units).await?;

    Ok(Json(WeatherResponse::new(
        city,
        coordinates,
        units,
        lang,
        current,
    )))
}

/// Handler for GET /forecast/:city
pub async fn forecast_handler(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>> {
    let services = &state.services;
    let units = query.units.unwrap_or(services.default_units);
    let lang = query.lang.unwrap_or(services.default_lang);

    let coordinates = services.geocoding.coordinates(&city).await?;
    let forecast = services
        .weather
        .forecast(coordinates, query.days, units)
        .await?;

    Ok(Json(ForecastResponse::new(
        city,
        coordinates,
        units,
        lang,
        forecast,
    )))
}

/// Handler for GET /stats
///
/// Returns per-domain cache and fetch counters plus limiter occupancy.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let services = &state.services;
    let geocoding = services.geocoding.fetcher();
    let current = services.weather.current_fetcher();
    let forecast = services.weather.forecast_fetcher();

    Json(StatsResponse {
        geocoding: DomainStats::new(&geocoding.cache_stats().await, &geocoding.fetch_stats()),
        current_weather: DomainStats::new(&current.cache_stats().await, &current.fetch_stats()),
        forecast: DomainStats::new(&forecast.cache_stats().await, &forecast.fetch_stats()),
        rate_limiter: LimiterStats {
            max_events: services.limiter.max_events(),
            window_secs: services.limiter.window().as_secs_f64(),
            in_window: services.limiter.in_window().await,
        },
    })
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.services.clear().await;
    Json(ClearResponse::new())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
