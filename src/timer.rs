//! Polled interval timers
//!
//! Timers never fire callbacks: the owner polls them from its tick. The time
//! source is injected so tests and replays can drive time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock, counting from its creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start_instant: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, ms: u64) {
        self.now_ms.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

/// Interval timer polled from a periodic tick.
///
/// [`Timer::poll`] returns true once per elapsed interval. When polled late
/// the period start advances by exactly one interval, so missed periods are
/// caught up on subsequent polls.
#[derive(Debug, Clone)]
pub struct Timer<C> {
    clock: C,
    interval_ms: u64,
    previous_ms: u64,
}

impl<C: Clock> Timer<C> {
    pub fn new(interval_ms: u64, clock: C) -> Self {
        let previous_ms = clock.now_ms();
        Self {
            clock,
            interval_ms,
            previous_ms,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval_ms
    }

    /// Restart the current period now, so the next poll fires one full
    /// interval from this moment
    pub fn begin_next_period(&mut self) {
        self.previous_ms = self.clock.now_ms();
    }

    /// True if an interval has elapsed since the start of the current period
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now_ms();
        if now.saturating_sub(self.previous_ms) >= self.interval_ms {
            self.previous_ms += self.interval_ms;
            return true;
        }
        false
    }
}
