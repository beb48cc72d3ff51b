//! Integration Tests for API Endpoints
//!
//! Runs the full request/response cycle against a local fake upstream that
//! speaks the Nominatim search and Open-Meteo forecast shapes and counts
//! every call it receives.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use travel_cache::models::{Language, Units};
use travel_cache::{api::create_router, clock::ManualClock, AppState, Config, Services};

// == Fake Upstream ==

#[derive(Clone, Default)]
struct Hits {
    geocode: Arc<AtomicUsize>,
    current: Arc<AtomicUsize>,
    forecast: Arc<AtomicUsize>,
    unavailable: Arc<AtomicUsize>,
}

async fn search(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hits.geocode.fetch_add(1, Ordering::SeqCst);
    // Long enough for concurrent callers to pile onto one flight
    tokio::time::sleep(Duration::from_millis(50)).await;

    match params.get("q").map(String::as_str) {
        Some("atlantis") => Json(json!([])),
        Some("lyon") => Json(json!([
            { "lat": "45.7578", "lon": "4.8320", "display_name": "Lyon" }
        ])),
        _ => Json(json!([
            { "lat": "48.8566", "lon": "2.3522", "display_name": "Paris" }
        ])),
    }
}

async fn forecast(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if params.get("current_weather").map(String::as_str) == Some("true") {
        hits.current.fetch_add(1, Ordering::SeqCst);
        return Json(json!({
            "latitude": 48.86,
            "longitude": 2.35,
            "current_weather": {
                "temperature": 18.4,
                "windspeed": 9.7,
                "winddirection": 240.0,
                "weathercode": 2,
                "time": "2026-10-19T14:00"
            }
        }));
    }

    hits.forecast.fetch_add(1, Ordering::SeqCst);
    let days: usize = params
        .get("forecast_days")
        .and_then(|d| d.parse().ok())
        .unwrap_or(7);
    let time: Vec<String> = (1..=days).map(|d| format!("2026-10-{:02}", d)).collect();

    Json(json!({
        "latitude": 48.86,
        "longitude": 2.35,
        "timezone": "Europe/Paris",
        "daily": {
            "time": time,
            "temperature_2m_max": vec![20.0; days],
            "temperature_2m_min": vec![10.0; days],
            "weathercode": vec![3; days]
        }
    }))
}

async fn unavailable(State(hits): State<Hits>) -> Response {
    hits.unavailable.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE.into_response()
}

async fn spawn_upstream() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/search", get(search))
        .route("/v1/forecast", get(forecast))
        .route("/unavailable", get(unavailable))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, hits)
}

// == Helper Functions ==

fn test_config(addr: SocketAddr) -> Config {
    Config {
        geocoding_url: format!("http://{}/search", addr),
        weather_url: format!("http://{}/v1/forecast", addr),
        rate_limit_events: 1000.0,
        retry_total: 2,
        retry_backoff: 0.01,
        http_timeout: 5.0,
        ..Config::default()
    }
}

struct TestApp {
    router: Router,
    hits: Hits,
    clock: Arc<ManualClock>,
}

async fn create_test_app() -> TestApp {
    let (addr, hits) = spawn_upstream().await;
    create_test_app_with(test_config(addr), hits).await
}

async fn create_test_app_with(config: Config, hits: Hits) -> TestApp {
    let clock = Arc::new(ManualClock::new());
    let services = Services::with_clock(&config, clock.clone()).unwrap();

    TestApp {
        router: create_router(AppState::new(services)),
        hits,
        clock,
    }
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// == Cache Lifetime ==

#[tokio::test]
async fn test_weather_cached_until_ttl_expires() {
    let app = create_test_app().await;

    let (status, json) = get_json(&app.router, "/weather/Paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current"]["temperature"], 18.4);
    assert_eq!(app.hits.geocode.load(Ordering::SeqCst), 1);
    assert_eq!(app.hits.current.load(Ordering::SeqCst), 1);

    // Within the 300s weather TTL nothing goes upstream
    app.clock.advance(Duration::from_secs(299));
    let (status, _) = get_json(&app.router, "/weather/Paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.hits.current.load(Ordering::SeqCst), 1);

    // Past it, only weather is refetched; geocoding lives for an hour
    app.clock.advance(Duration::from_secs(2));
    let (status, _) = get_json(&app.router, "/weather/Paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.hits.current.load(Ordering::SeqCst), 2);
    assert_eq!(app.hits.geocode.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_city_names_share_cache_entry() {
    let app = create_test_app().await;

    get_json(&app.router, "/geocode/Paris").await;
    get_json(&app.router, "/geocode/PARIS").await;
    get_json(&app.router, "/geocode/%20paris%20").await;

    assert_eq!(app.hits.geocode.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_lookups_coalesce() {
    let app = create_test_app().await;

    let requests = (0..10).map(|_| {
        let router = app.router.clone();
        tokio::spawn(async move { get_json(&router, "/geocode/Lyon").await })
    });
    for handle in futures::future::join_all(requests).await {
        let (status, json) = handle.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["coordinates"]["lat"], 45.7578);
    }

    assert_eq!(app.hits.geocode.load(Ordering::SeqCst), 1);

    let (_, stats) = get_json(&app.router, "/stats").await;
    assert_eq!(stats["geocoding"]["fetches"], 1);
    let joined = stats["geocoding"]["coalesced"].as_u64().unwrap()
        + stats["geocoding"]["hits"].as_u64().unwrap();
    assert_eq!(joined, 9);
}

// == Failures ==

#[tokio::test]
async fn test_unknown_city_is_not_found_and_not_cached() {
    let app = create_test_app().await;

    let (status, json) = get_json(&app.router, "/geocode/Atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("atlantis"));

    get_json(&app.router, "/geocode/Atlantis").await;
    assert_eq!(app.hits.geocode.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_upstream_outage_retries_then_bad_gateway() {
    let (addr, hits) = spawn_upstream().await;
    let config = Config {
        geocoding_url: format!("http://{}/unavailable", addr),
        ..test_config(addr)
    };
    let app = create_test_app_with(config, hits).await;

    let (status, json) = get_json(&app.router, "/geocode/Paris").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json.get("error").is_some());
    // First attempt plus two retries
    assert_eq!(app.hits.unavailable.load(Ordering::SeqCst), 3);

    // Failures are never cached
    get_json(&app.router, "/geocode/Paris").await;
    assert_eq!(app.hits.unavailable.load(Ordering::SeqCst), 6);

    let (_, stats) = get_json(&app.router, "/stats").await;
    assert_eq!(stats["geocoding"]["failures"], 2);
    assert_eq!(stats["geocoding"]["total_entries"], 0);
}

// == Forecast ==

#[tokio::test]
async fn test_forecast_days_and_units() {
    let app = create_test_app().await;

    let (status, json) = get_json(&app.router, "/forecast/Paris?days=3&units=imperial").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["units"], "imperial");
    assert_eq!(json["forecast"]["daily"]["time"].as_array().unwrap().len(), 3);

    // Different day counts are different entries
    get_json(&app.router, "/forecast/Paris?days=5&units=imperial").await;
    get_json(&app.router, "/forecast/Paris?days=3&units=imperial").await;
    assert_eq!(app.hits.forecast.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_forecast_days_out_of_range() {
    let app = create_test_app().await;

    let (status, _) = get_json(&app.router, "/forecast/Paris?days=17").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.hits.forecast.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_weather_codes_described_in_requested_language() {
    let app = create_test_app().await;

    let (_, json) = get_json(&app.router, "/weather/Paris").await;
    assert_eq!(json["lang"], "en");
    assert_eq!(json["description"], "Partly cloudy");

    let (_, json) = get_json(&app.router, "/forecast/Paris?days=2&lang=zh").await;
    assert_eq!(json["descriptions"], json!(["阴", "阴"]));
}

#[tokio::test]
async fn test_configured_defaults_apply_when_query_omits_them() {
    let (addr, hits) = spawn_upstream().await;
    let config = Config {
        default_units: Units::Imperial,
        default_lang: Language::Zh,
        ..test_config(addr)
    };
    let app = create_test_app_with(config, hits).await;

    let (status, json) = get_json(&app.router, "/weather/Paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["units"], "imperial");
    assert_eq!(json["description"], "多云");

    // Explicit query values still win
    let (_, json) = get_json(&app.router, "/weather/Paris?units=metric&lang=en").await;
    assert_eq!(json["units"], "metric");
    assert_eq!(json["description"], "Partly cloudy");
}

// == Diagnostics ==

#[tokio::test]
async fn test_stats_report_hits_and_misses() {
    let app = create_test_app().await;

    get_json(&app.router, "/geocode/Paris").await;
    get_json(&app.router, "/geocode/Paris").await;

    let (status, stats) = get_json(&app.router, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["geocoding"]["hits"], 1);
    assert_eq!(stats["geocoding"]["misses"], 1);
    assert_eq!(stats["geocoding"]["hit_rate"], 50.0);
    assert_eq!(stats["geocoding"]["total_entries"], 1);
    assert_eq!(stats["rate_limiter"]["in_window"], 1);
}

#[tokio::test]
async fn test_clear_forces_refetch() {
    let app = create_test_app().await;

    get_json(&app.router, "/geocode/Paris").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    get_json(&app.router, "/geocode/Paris").await;
    assert_eq!(app.hits.geocode.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let (status, json) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
