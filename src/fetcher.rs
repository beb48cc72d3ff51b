//! Cached Fetcher Module
//!
//! Get-or-fetch composition of a `TtlCache`, the shared `RateLimiter` and an
//! arbitrary fetch future. One instance per data domain.
//!
//! Concurrent misses for the same key share a single in-flight fetch instead
//! of each passing the limiter and hitting the upstream service.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStats, TtlCache};
use crate::error::{Result, ServiceError};
use crate::rate_limit::RateLimiter;

type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

// == Fetch Stats ==
/// Counters for calls that went past the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchStats {
    /// External calls actually issued
    pub fetches: u64,
    /// External calls that ended in an error
    pub failures: u64,
    /// Misses that joined a fetch already in flight
    pub coalesced: u64,
}

#[derive(Debug, Default)]
struct FetchCounters {
    fetches: AtomicU64,
    failures: AtomicU64,
    coalesced: AtomicU64,
}

// == Cached Fetcher ==
/// Answers lookups from the cache, fetching and storing on a miss.
pub struct CachedFetcher<V> {
    domain: &'static str,
    cache: Arc<Mutex<TtlCache<V>>>,
    in_flight: Arc<Mutex<HashMap<String, Flight<V>>>>,
    limiter: Arc<RateLimiter>,
    counters: Arc<FetchCounters>,
}

impl<V> Clone for CachedFetcher<V> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain,
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
            limiter: Arc::clone(&self.limiter),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<V> CachedFetcher<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// `domain` names the fetcher in logs and stats.
    pub fn new(domain: &'static str, cache: TtlCache<V>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            domain,
            cache: Arc::new(Mutex::new(cache)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            limiter,
            counters: Arc::new(FetchCounters::default()),
        }
    }

    // == Get Or Fetch ==
    /// Returns the cached value for `key`, or fetches, caches and returns it.
    ///
    /// On a miss the first caller waits for the rate limiter and runs `fetch`;
    /// callers missing on the same key meanwhile await that same fetch and
    /// receive its result. Only successes are cached, for `ttl`.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let flight = {
            let mut in_flight = self.in_flight.lock().await;

            // Checked under the in-flight lock: a finishing fetch stores its
            // value before unregistering, so a miss here means either no fetch
            // or one that is still running.
            let cached = self.cache.lock().await.get(key);
            if let Some(value) = cached {
                debug!("[{}] cache hit: {}", self.domain, key);
                return Ok(value);
            }

            if let Some(flight) = in_flight.get(key) {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!("[{}] joining in-flight fetch: {}", self.domain, key);
                flight.clone()
            } else {
                debug!("[{}] cache miss: {}", self.domain, key);
                let flight = self.start_flight(key.to_string(), ttl, fetch());
                in_flight.insert(key.to_string(), flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Spawns `fetch` as a task that throttles, caches and unregisters itself.
    ///
    /// The task runs to completion even if every caller awaiting it goes
    /// away, so the limiter and the in-flight map are always released.
    fn start_flight<Fut>(&self, key: String, ttl: Duration, fetch: Fut) -> Flight<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let domain = self.domain;
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let limiter = Arc::clone(&self.limiter);
        let counters = Arc::clone(&self.counters);

        let task_key = key.clone();
        let task_in_flight = Arc::clone(&in_flight);
        let task = tokio::spawn(async move {
            let key = task_key;
            limiter.acquire().await;
            counters.fetches.fetch_add(1, Ordering::Relaxed);
            info!("[{}] fetching from upstream: {}", domain, key);

            let result = fetch.await;
            match &result {
                Ok(value) => cache.lock().await.set(key.clone(), value.clone(), ttl),
                Err(err) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("[{}] fetch failed for {}: {}", domain, key, err);
                }
            }

            task_in_flight.lock().await.remove(&key);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    // The task never reached its own unregister step
                    in_flight.lock().await.remove(&key);
                    error!("[{}] fetch task for {} died: {}", domain, key, err);
                    Err(ServiceError::Internal(format!("fetch task failed: {}", err)))
                }
            }
        }
        .boxed()
        .shared()
    }

    // == Maintenance ==
    /// Empties the cache. In-flight fetches still complete and store their result.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    /// Eagerly drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.cache.lock().await.purge_expired()
    }

    // == Stats ==
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    pub fn fetch_stats(&self) -> FetchStats {
        FetchStats {
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }
}

/// Turns a fetch failure into the given domain error.
pub fn domain_error<E: std::fmt::Display>(
    kind: fn(String) -> ServiceError,
) -> impl Fn(E) -> ServiceError {
    move |err| kind(err.to_string())
}
