//! Geocoding Service
//!
//! City name to coordinates via a Nominatim-compatible search endpoint,
//! cached for the long geocoding TTL.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServiceError};
use crate::fetcher::{domain_error, CachedFetcher};
use crate::models::Coordinates;
use crate::transport::RetryingTransport;

/// One match from the search endpoint. Nominatim reports coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

// == Geocoding Service ==
#[derive(Clone)]
pub struct GeocodingService {
    fetcher: CachedFetcher<Coordinates>,
    transport: RetryingTransport,
    url: String,
    ttl: Duration,
}

impl GeocodingService {
    pub fn new(
        fetcher: CachedFetcher<Coordinates>,
        transport: RetryingTransport,
        url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            transport,
            url: url.into(),
            ttl,
        }
    }

    // == Coordinates ==
    /// Resolves `city` to coordinates.
    ///
    /// An empty result set is `LocationNotFound`; transport failures after
    /// retries are `Geocoding` errors. Neither is cached.
    pub async fn coordinates(&self, city: &str) -> Result<Coordinates> {
        let city = normalize_city(city)?;
        let key = cache_key(&city);
        let transport = self.transport.clone();
        let url = self.url.clone();

        self.fetcher
            .get_or_fetch(&key, self.ttl, move || async move {
                let query = [
                    ("q", city.clone()),
                    ("format", "json".to_string()),
                    ("limit", "1".to_string()),
                ];
                let places: Vec<Place> = transport
                    .get_json(&url, &query)
                    .await
                    .map_err(domain_error(ServiceError::Geocoding))?;

                let place = places
                    .first()
                    .ok_or_else(|| ServiceError::LocationNotFound(city.clone()))?;
                parse_place(place)
            })
            .await
    }

    pub fn fetcher(&self) -> &CachedFetcher<Coordinates> {
        &self.fetcher
    }
}

/// Trims and lowercases a city name so equivalent queries share one cache entry.
fn normalize_city(city: &str) -> Result<String> {
    let city = city.trim();
    if city.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "City name cannot be empty".to_string(),
        ));
    }
    Ok(city.to_lowercase())
}

fn cache_key(normalized_city: &str) -> String {
    format!("geo:{}", normalized_city)
}

fn parse_place(place: &Place) -> Result<Coordinates> {
    let lat = parse_degrees("latitude", &place.lat)?;
    let lon = parse_degrees("longitude", &place.lon)?;
    Ok(Coordinates::new(lat, lon))
}

/// Parses one coordinate, rejecting values that are not finite numbers.
fn parse_degrees(axis: &str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(ServiceError::Geocoding(format!(
            "invalid {} '{}': not a finite number",
            axis, raw
        ))),
        Err(e) => Err(ServiceError::Geocoding(format!(
            "invalid {} '{}': {}",
            axis, raw, e
        ))),
    }
}
