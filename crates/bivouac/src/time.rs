//! Frame timing.
//!
//! The host loop ticks the [`Time`] resource once per frame before running
//! the update closure, and passes [`delta_secs`](Time::delta_secs) on as the
//! closure's `dt`. Long stalls (a dragged window, a breakpoint) are clamped
//! to [`Time::MAX_DELTA`] so systems never see a huge step.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Time {
    startup: Instant,
    last_tick: Instant,
    delta: Duration,
    elapsed: Duration,
    frame: u64,
}

impl Time {
    /// Longest step handed to systems.
    pub const MAX_DELTA: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            last_tick: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame: 0,
        }
    }

    /// Start a new frame now.
    pub(crate) fn tick(&mut self) {
        let now = Instant::now();
        self.advance(now - self.last_tick);
        self.last_tick = now;
        self.elapsed = now - self.startup;
    }

    /// Start a new frame `delta` after the last one.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta.min(Self::MAX_DELTA);
        self.elapsed += self.delta;
        self.frame += 1;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Seconds since the previous frame, the `dt` systems are updated with.
    pub fn delta_secs(&self) -> f64 {
        self.delta.as_secs_f64()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Instantaneous frame rate from the last delta.
    pub fn fps(&self) -> f64 {
        let secs = self.delta_secs();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
