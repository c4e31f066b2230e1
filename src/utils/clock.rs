//! Clock sources for sprite recency tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic millisecond clock used to stamp `last_used_at`
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn now_millis(&self) -> u64;
}

/// Wall-independent clock backed by [`Instant`]
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for deterministic eviction ordering
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward and return the new time
    pub fn advance(&self, millis: u64) -> u64 {
        self.now.fetch_add(millis, Ordering::SeqCst) + millis
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now_millis();
        let second = clock.now_millis();
        assert!(second >= first);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now_millis(), 10);
        assert_eq!(clock.advance(5), 15);
        clock.set(100);
        assert_eq!(clock.now_millis(), 100);
    }
}
