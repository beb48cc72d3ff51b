//! API Routes
//!
//! Configures the Axum router with the lookup and diagnostics endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, forecast_handler, geocode_handler, health_handler, stats_handler,
    weather_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /geocode/:city` - Coordinates for a city
/// - `GET /weather/:city` - Current weather for a city
/// - `GET /forecast/:city` - Daily forecast for a city
/// - `GET /stats` - Cache, fetch and rate limiter statistics
/// - `DELETE /cache` - Empty every cache
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/geocode/:city", get(geocode_handler))
        .route("/weather/:city", get(weather_handler))
        .route("/forecast/:city", get(forecast_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
