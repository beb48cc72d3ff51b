//! API Module
//!
//! HTTP handlers and routing for the lookup and diagnostics API.
//!
//! # Endpoints
//! - `GET /geocode/:city` - Coordinates for a city
//! - `GET /weather/:city` - Current weather for a city
//! - `GET /forecast/:city` - Daily forecast for a city
//! - `GET /stats` - Cache statistics
//! - `DELETE /cache` - Clear all caches
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
