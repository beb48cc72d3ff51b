//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Config Error ==
/// Degenerate configuration detected at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A configured value is outside its valid range
    #[error("Invalid configuration for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// The pooled HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

// == Transport Error ==
/// Failure of a single outbound HTTP call.
///
/// Clonable so that one failed fetch can be handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        retry_after: Option<Duration>,
    },

    /// Connection could not be established or was reset
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Attempt exceeded the per-request timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Body could not be decoded into the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Server-requested delay, if the response carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                retry_after: None,
            }
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

// == Service Error ==
/// Domain error surfaced by the get-or-fetch facades.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Geocoding succeeded but matched nothing
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Geocoding service failed after retries
    #[error("Geocoding error: {0}")]
    Geocoding(String),

    /// Weather service failed after retries
    #[error("Weather API error: {0}")]
    WeatherApi(String),

    /// Caller supplied arguments that cannot be looked up
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A fetch task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Geocoding(_) | ServiceError::WeatherApi(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the facades.
pub type Result<T> = std::result::Result<T, ServiceError>;
