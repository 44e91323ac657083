//! Frame timing.

use std::time::{Duration, Instant};

/// Measures the time between successive [`tick`](Timer::tick)s.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    startup: Instant,
    last_tick: Instant,
    delta: Duration,
    frame_count: u64,
}

impl Timer {
    /// A timer started now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            last_tick: now,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Restart the delta measurement from now.
    pub fn restart(&mut self) {
        self.last_tick = Instant::now();
        self.delta = Duration::ZERO;
    }

    /// Close the current frame and return its length in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.frame_count += 1;
        self.delta.as_secs_f32()
    }

    /// Length of the last frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Length of the last frame in seconds.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.startup.elapsed()
    }

    /// Number of ticks so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second estimated from the last delta.
    pub fn fps(&self) -> f32 {
        let secs = self.delta.as_secs_f32();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
