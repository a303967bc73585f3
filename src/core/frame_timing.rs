//! # Frame Timing
//!
//! Per-frame wall-clock statistics in microseconds, measured around the scheduler
//! dispatch (arm → all finished → publish). Used for trace logging in the context
//! and for the benchmark report.

use std::time::Duration;

/// Running statistics over processed frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTiming {
    pub frames: u64,
    pub skipped: u64,
    pub last_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub total_us: u64,
}

impl FrameTiming {
    pub fn record(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.min_us = if self.frames == 0 { us } else { self.min_us.min(us) };
        self.max_us = self.max_us.max(us);
        self.last_us = us;
        self.total_us = self.total_us.saturating_add(us);
        self.frames += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn average_us(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.total_us as f64 / self.frames as f64
        }
    }

    /// Frames per second the kernels could sustain at the average cost.
    pub fn sustainable_fps(&self) -> f64 {
        let avg = self.average_us();
        if avg == 0.0 { 0.0 } else { 1_000_000.0 / avg }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for FrameTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames ({} skipped): avg {:.1} us, min {} us, max {} us",
            self.frames,
            self.skipped,
            self.average_us(),
            self.min_us,
            self.max_us
        )
    }
}
