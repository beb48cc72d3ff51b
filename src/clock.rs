//! Clock Module
//!
//! Monotonic time source shared by the cache and the rate limiter.
//!
//! Time is read through `tokio::time::Instant`, so tests that pause the tokio
//! clock see deterministic timestamps from `SystemClock` as well.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

// == Clock Trait ==
/// Supplies the current monotonic instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

// == System Clock ==
/// Production clock backed by the tokio time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// == Manual Clock ==
/// Clock that only moves when told to.
///
/// Used to drive TTL expiry in tests without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.start + *offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_stands_still() {
        let clock = ManualClock::new();
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, b);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let before = clock.now();

        clock.advance(Duration::from_secs(301));

        assert_eq!(clock.now() - before, Duration::from_secs(301));
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_follows_paused_time() {
        let clock = SystemClock;
        let before = clock.now();

        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(clock.now() - before >= Duration::from_secs(5));
    }
}
