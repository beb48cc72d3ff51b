//! Domain values and request/response models
//!
//! This module defines the values the facades cache and the DTOs used for
//! serializing/deserializing HTTP query strings and response bodies.

pub mod requests;
pub mod responses;
pub mod weather;
pub mod weather_code;

// Re-export commonly used types
pub use requests::{ForecastQuery, WeatherQuery, DEFAULT_FORECAST_DAYS};
pub use responses::{
    ClearResponse, DomainStats, ForecastResponse, GeocodeResponse, HealthResponse, LimiterStats,
    StatsResponse, WeatherResponse,
};
pub use weather::{Coordinates, CurrentWeather, DailyForecast, Forecast, Units};
pub use weather_code::{describe, Language};
