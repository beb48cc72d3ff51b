//! Travel Cache - caching and outbound throttling for travel lookups
//!
//! Bounded TTL/LRU caches, a sliding-window rate limiter and a retrying HTTP
//! transport, composed into get-or-fetch facades for geocoding, current
//! weather and forecasts.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod tasks;
pub mod transport;

pub use api::AppState;
pub use config::Config;
pub use services::Services;
pub use tasks::spawn_cleanup_task;
