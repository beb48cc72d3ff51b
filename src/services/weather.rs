//! Weather Service
//!
//! Current conditions and daily forecasts from an Open-Meteo compatible
//! endpoint. Each has its own cache and TTL; both share the limiter.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServiceError};
use crate::fetcher::{domain_error, CachedFetcher};
use crate::models::{Coordinates, CurrentWeather, Forecast, Units};
use crate::transport::RetryingTransport;

/// Longest forecast the upstream serves.
pub const MAX_FORECAST_DAYS: u8 = 16;

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,weathercode";

#[derive(Debug, Deserialize)]
struct CurrentEnvelope {
    current_weather: CurrentWeather,
}

// == Weather Service ==
#[derive(Clone)]
pub struct WeatherService {
    current: CachedFetcher<CurrentWeather>,
    forecast: CachedFetcher<Forecast>,
    transport: RetryingTransport,
    url: String,
    current_ttl: Duration,
    forecast_ttl: Duration,
}

impl WeatherService {
    pub fn new(
        current: CachedFetcher<CurrentWeather>,
        forecast: CachedFetcher<Forecast>,
        transport: RetryingTransport,
        url: impl Into<String>,
        current_ttl: Duration,
        forecast_ttl: Duration,
    ) -> Self {
        Self {
            current,
            forecast,
            transport,
            url: url.into(),
            current_ttl,
            forecast_ttl,
        }
    }

    // == Current ==
    /// Current conditions at `coords`.
    pub async fn current(&self, coords: Coordinates, units: Units) -> Result<CurrentWeather> {
        let key = format!("weather:{}:{}", coords.key_fragment(), units);
        let transport = self.transport.clone();
        let url = self.url.clone();

        self.current
            .get_or_fetch(&key, self.current_ttl, move || async move {
                let mut query = location_query(coords, units);
                query.push(("current_weather", "true".to_string()));

                let envelope: CurrentEnvelope = transport
                    .get_json(&url, &query)
                    .await
                    .map_err(domain_error(ServiceError::WeatherApi))?;
                Ok(envelope.current_weather)
            })
            .await
    }

    // == Forecast ==
    /// Daily forecast for `days` days (1 to 16) at `coords`.
    pub async fn forecast(&self, coords: Coordinates, days: u8, units: Units) -> Result<Forecast> {
        if days == 0 || days > MAX_FORECAST_DAYS {
            return Err(ServiceError::InvalidRequest(format!(
                "days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, days
            )));
        }

        let key = format!("forecast:{}:{}:{}", coords.key_fragment(), days, units);
        let transport = self.transport.clone();
        let url = self.url.clone();

        self.forecast
            .get_or_fetch(&key, self.forecast_ttl, move || async move {
                let mut query = location_query(coords, units);
                query.push(("forecast_days", days.to_string()));
                query.push(("daily", DAILY_FIELDS.to_string()));
                query.push(("timezone", "auto".to_string()));

                transport
                    .get_json::<Forecast>(&url, &query)
                    .await
                    .map_err(domain_error(ServiceError::WeatherApi))
            })
            .await
    }

    pub fn current_fetcher(&self) -> &CachedFetcher<CurrentWeather> {
        &self.current
    }

    pub fn forecast_fetcher(&self) -> &CachedFetcher<Forecast> {
        &self.forecast
    }
}

fn location_query(coords: Coordinates, units: Units) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coords.lat.to_string()),
        ("longitude", coords.lon.to_string()),
        ("temperature_unit", units.temperature_unit().to_string()),
        ("windspeed_unit", units.windspeed_unit().to_string()),
    ]
}
