//! Frame-rate throttle for sources faster than the panel can show.

use tracing::debug;

/// Integer accumulator deciding which frames to process.
///
/// Every frame adds `cap`; a frame is processed when the accumulator reaches
/// `fps`, which then gets subtracted. At 90 fps against a 60 fps cap exactly two
/// of any three consecutive frames are processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FpsThrottle {
    fps: u32,
    cap: u32,
    accumulated: u32,
}

impl FpsThrottle {
    /// Enable throttling when `fps` exceeds `cap`, disable it otherwise.
    pub fn configure(&mut self, fps: u32, cap: u32) {
        let active = cap > 0 && fps > cap;
        *self = if active { Self { fps, cap, accumulated: 0 } } else { Self::default() };
        debug!(fps, cap, active, "frame-rate throttle configured");
    }

    pub fn is_active(&self) -> bool {
        self.fps > 0
    }

    /// Whether the next frame should be processed.
    pub fn admit(&mut self) -> bool {
        if !self.is_active() {
            return true;
        }
        self.accumulated += self.cap;
        if self.accumulated >= self.fps {
            self.accumulated -= self.fps;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_of_three_at_ninety() {
        let mut t = FpsThrottle::default();
        t.configure(90, 60);
        let decisions: Vec<bool> = (0..30).map(|_| t.admit()).collect();
        for window in decisions.windows(3) {
            assert_eq!(window.iter().filter(|&&d| d).count(), 2, "{decisions:?}");
        }
    }

    #[test]
    fn test_inactive_admits_everything() {
        let mut t = FpsThrottle::default();
        t.configure(60, 60);
        assert!(!t.is_active());
        assert!((0..10).all(|_| t.admit()));
        t.configure(120, 60);
        let processed = (0..100).filter(|_| t.admit()).count();
        assert_eq!(processed, 50);
        t.configure(0, 60);
        assert!(t.admit());
    }
}
