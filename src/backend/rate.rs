//! Intake rate measurement.
//!
//! Window-reset counting: a plain counter advanced once per accepted event,
//! swapped out every `rate_window`. Cheaper than a sliding log of recent
//! timestamps and sufficient for the throttle controller's purposes.

use crate::clock::Clock;
use std::time::{Duration, Instant};

/// Tracks intake rate over rolling, non-overlapping windows.
pub struct RateMeter {
    window: Duration,
    count: u64,
    window_start: Instant,
    rate: f64,
}

impl RateMeter {
    pub fn new(window: Duration, clock: &dyn Clock) -> Self {
        Self { window, count: 0, window_start: clock.monotonic(), rate: 0.0 }
    }

    /// Record one event. Call this once per accepted log or progress update.
    pub fn record_event(&mut self, clock: &dyn Clock) {
        self.count += 1;
        self.maybe_roll_window(clock);
    }

    /// Roll the window if it has elapsed, recomputing `rate` from the count
    /// accumulated since the last roll. Safe to call on every processor-loop
    /// iteration even when no event was just recorded, so the rate decays
    /// toward zero during quiet periods instead of reporting a stale value.
    pub fn maybe_roll_window(&mut self, clock: &dyn Clock) {
        let now = clock.monotonic();
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= self.window {
            self.rate = self.count as f64 / elapsed.as_secs_f64();
            self.count = 0;
            self.window_start = now;
        }
    }

    /// The most recently computed rate, in events/second.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}
