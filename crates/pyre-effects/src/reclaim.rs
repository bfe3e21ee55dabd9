//! Coarse fixed-interval timer driving the reclaim scan.
//!
//! Scanning every frame is wasteful for effects that live for seconds, so
//! the scan runs on an interval. An effect can outlive its duration by up
//! to one interval.

/// Default seconds between reclaim scans.
pub const DEFAULT_RECLAIM_INTERVAL: f32 = 1.0;

/// Shortest accepted reclaim interval in seconds.
pub const MIN_RECLAIM_INTERVAL: f32 = 0.05;

/// Longest accepted reclaim interval in seconds.
pub const MAX_RECLAIM_INTERVAL: f32 = 10.0;

/// Accumulates frame time and fires once per elapsed interval.
#[derive(Debug, Clone)]
pub struct ReclaimScheduler {
    interval: f32,
    accumulated: f32,
}

impl Default for ReclaimScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_RECLAIM_INTERVAL)
    }
}

impl ReclaimScheduler {
    /// Creates a scheduler; the interval is clamped to the accepted range.
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self {
            interval: clamp_interval(interval),
            accumulated: 0.0,
        }
    }

    /// Seconds between scans.
    #[must_use]
    pub const fn interval(&self) -> f32 {
        self.interval
    }

    /// Changes the interval, keeping accumulated time.
    pub fn set_interval(&mut self, interval: f32) {
        self.interval = clamp_interval(interval);
    }

    /// Advances by `dt` seconds. Returns true when a scan is due.
    ///
    /// Fires at most once per call; the remainder carries over.
    pub fn tick(&mut self, dt: f32) -> bool {
        if dt.is_finite() && dt > 0.0 {
            self.accumulated += dt;
        }
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated = (self.accumulated - self.interval).min(self.interval);
        true
    }

    /// Forgets accumulated time.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

fn clamp_interval(interval: f32) -> f32 {
    if interval.is_finite() {
        interval.clamp(MIN_RECLAIM_INTERVAL, MAX_RECLAIM_INTERVAL)
    } else {
        DEFAULT_RECLAIM_INTERVAL
    }
}
