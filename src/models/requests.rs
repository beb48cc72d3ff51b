//! Query DTOs for the lookup endpoints
//!
//! Defines the query strings accepted by the weather and forecast routes.
//! Omitted units and language fall back to the configured defaults.

use serde::Deserialize;

use crate::models::{Language, Units};

/// Default number of forecast days.
pub const DEFAULT_FORECAST_DAYS: u8 = 7;

/// Query for `GET /weather/:city`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherQuery {
    pub units: Option<Units>,
    pub lang: Option<Language>,
}

/// Query for `GET /forecast/:city`
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastQuery {
    /// Number of days, 1 to 16
    #[serde(default = "default_days")]
    pub days: u8,
    pub units: Option<Units>,
    pub lang: Option<Language>,
}

impl Default for ForecastQuery {
    fn default() -> Self {
        Self {
            days: DEFAULT_FORECAST_DAYS,
            units: None,
            lang: None,
        }
    }
}

fn default_days() -> u8 {
    DEFAULT_FORECAST_DAYS
}
