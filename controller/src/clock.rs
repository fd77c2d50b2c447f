//! Monotonic millisecond clock.
//!
//! Every timing decision in the controller is made against a `u64`
//! millisecond timestamp handed in by the caller, so the blink classifier,
//! popup timeout and alert pattern can be driven deterministically in tests.
//! The event loop reads time through the [`Clock`] trait.

use std::cell::Cell;
use std::time::Instant;

/// Milliseconds on a monotonic timeline.
pub type Millis = u64;

/// Source of monotonic time.
pub trait Clock {
    /// Current time in milliseconds since the clock's origin.
    fn now_ms(&self) -> Millis;

    /// Milliseconds elapsed since `start`, saturating at zero.
    fn elapsed_since(&self, start: Millis) -> Millis {
        self.now_ms().saturating_sub(start)
    }
}

/// Wall clock backed by [`Instant`], starting at zero on creation.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Hand-driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 350);
        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_elapsed_since_saturates() {
        let clock = ManualClock::new(500);
        assert_eq!(clock.elapsed_since(200), 300);
        assert_eq!(
            clock.elapsed_since(900),
            0,
            "start in the future must not underflow"
        );
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
