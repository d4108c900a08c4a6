//! Monotonic time source.
//!
//! A [`Clock`] starts on its first [`Clock::delta`] call, so the first delta is
//! always zero. Reading the delta moves the internal marker: two readers sharing
//! one clock will each see only part of the interval. Give every consumer that
//! needs its own cadence its own clock.

use instant::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Clock {
    start: Option<Instant>,
    last: Option<Instant>,
}

impl Clock {
    /// Create a stopped clock. It starts on the first call to [`Clock::delta`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that is already running.
    pub fn started() -> Self {
        let now = Instant::now();
        Self {
            start: Some(now),
            last: Some(now),
        }
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }

    /// Time since the previous call. Consuming: resets the marker to now.
    pub fn delta(&mut self) -> Duration {
        let now = Instant::now();
        match self.last.replace(now) {
            Some(last) => now.duration_since(last),
            None => {
                self.start = Some(now);
                Duration::ZERO
            }
        }
    }

    /// Total time since the clock started. Does not touch the delta marker.
    pub fn elapsed(&self) -> Duration {
        self.start.map(|start| start.elapsed()).unwrap_or_default()
    }
}
