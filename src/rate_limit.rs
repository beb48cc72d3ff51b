//! Rate Limiter Module
//!
//! Process-wide sliding-window admission control for outbound calls.
//!
//! Admission timestamps live in a rolling deque; any trailing window holds at
//! most `max_events` of them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::clock::Clock;

// == Rate Limiter ==
/// Bounds outbound calls to `max_events` per trailing `window`.
///
/// A `max_events` of zero disables the limiter.
pub struct RateLimiter {
    max_events: usize,
    window: Duration,
    /// Admission timestamps, oldest first
    events: Mutex<VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    // == Constructor ==
    pub fn new(max_events: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_events,
            window,
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            clock,
        }
    }

    /// Builds a limiter from a configured events-per-window rate.
    ///
    /// Rates of one or more are truncated to whole events. A positive rate
    /// below one becomes a single event per `window / rate`, so 0.5 per second
    /// admits one call every two seconds. A rate at or below zero disables
    /// limiting.
    pub fn from_rate(events_per_window: f64, window: Duration, clock: Arc<dyn Clock>) -> Self {
        if !(events_per_window.is_finite() && events_per_window > 0.0) {
            return Self::new(0, window, clock);
        }
        if events_per_window >= 1.0 {
            return Self::new(events_per_window as usize, window, clock);
        }

        let stretched = scaled_window(events_per_window, window).unwrap_or(Duration::MAX);
        Self::new(1, stretched, clock)
    }

    // == Acquire ==
    /// Waits until one more call fits in the window, then records it.
    ///
    /// The prune/check/record sequence, sleep included, runs under a single
    /// lock, so waiters are admitted one at a time in arrival order.
    pub async fn acquire(&self) {
        if self.is_disabled() {
            return;
        }

        let mut events = self.events.lock().await;
        loop {
            let now = self.clock.now();
            prune(&mut events, now, self.window);

            if events.len() < self.max_events {
                events.push_back(now);
                return;
            }

            let wait = events
                .front()
                .map(|&oldest| match oldest.checked_add(self.window) {
                    Some(frees_at) => frees_at.saturating_duration_since(now),
                    None => self.window,
                })
                .unwrap_or_default();
            debug!(
                "Rate limit reached ({} per {:?}), waiting {:?}",
                self.max_events, self.window, wait
            );
            tokio::time::sleep(wait).await;
        }
    }

    // == In Window ==
    /// Number of admissions inside the trailing window right now.
    pub async fn in_window(&self) -> usize {
        let mut events = self.events.lock().await;
        prune(&mut events, self.clock.now(), self.window);
        events.len()
    }

    pub fn is_disabled(&self) -> bool {
        self.max_events == 0
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_events", &self.max_events)
            .field("window", &self.window)
            .finish()
    }
}

/// Window holding one event for a rate below one, or `None` if unrepresentable.
pub fn scaled_window(events_per_window: f64, window: Duration) -> Option<Duration> {
    Duration::try_from_secs_f64(window.as_secs_f64() / events_per_window).ok()
}

/// Drops timestamps that no longer fall inside `(now - window, now]`.
fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = events.front() {
        if now.saturating_duration_since(oldest) >= window {
            events.pop_front();
        } else {
            break;
        }
    }
}
