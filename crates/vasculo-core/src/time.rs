//! Frame timing
//!
//! Frame deltas and the smoothed frame-rate statistics the performance
//! controller adapts on, plus a lap timer for load phases.

use std::time::{Duration, Instant};

/// Duration of one rendered frame, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaTime(pub f64);

impl DeltaTime {
    pub fn from_millis(millis: f64) -> Self {
        Self(millis / 1000.0)
    }

    /// Frame rate implied by this delta, 0 for non-positive deltas
    pub fn fps(&self) -> f64 {
        if self.0 > 0.0 { 1.0 / self.0 } else { 0.0 }
    }
}

impl From<Duration> for DeltaTime {
    fn from(duration: Duration) -> Self {
        Self(duration.as_secs_f64())
    }
}

/// Smoothed frame-rate statistics.
///
/// [`FrameStats::observe`] returns the next state rather than mutating, so
/// adaptation rules can be checked against fixed sample sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Exponential moving average of the frame rate
    pub smoothed_fps: f64,
    /// Rolling count of frames below the low-rate threshold
    pub low_frame_count: u32,
    /// Frames observed since the last reset
    pub frames: u64,
}

impl FrameStats {
    /// Statistics before any frame, assuming 60 fps
    pub const INITIAL: Self = Self {
        smoothed_fps: 60.0,
        low_frame_count: 0,
        frames: 0,
    };

    /// Fold one frame-rate sample in.
    ///
    /// `ema_weight` is the weight kept by the previous average. The low
    /// counter rises for samples under `low_fps_threshold` and otherwise
    /// decays by one, saturating at zero.
    pub fn observe(self, fps: f64, ema_weight: f64, low_fps_threshold: f64) -> Self {
        let weight = ema_weight.clamp(0.0, 1.0);
        let low_frame_count = if fps < low_fps_threshold {
            self.low_frame_count.saturating_add(1)
        } else {
            self.low_frame_count.saturating_sub(1)
        };

        Self {
            smoothed_fps: self.smoothed_fps * weight + fps * (1.0 - weight),
            low_frame_count,
            frames: self.frames + 1,
        }
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Lap timer for the phases of a load
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimer {
    lap_start: Instant,
}

impl PhaseTimer {
    /// Timer whose first lap starts now
    pub fn start() -> Self {
        Self {
            lap_start: Instant::now(),
        }
    }

    /// Milliseconds since the previous lap (or since start), then begin a new lap
    pub fn lap_millis(&mut self) -> f64 {
        let now = Instant::now();
        let millis = now.duration_since(self.lap_start).as_secs_f64() * 1000.0;
        self.lap_start = now;
        millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_fps() {
        assert!((DeltaTime::from_millis(20.0).fps() - 50.0).abs() < 1e-9);
        assert!((DeltaTime::from(Duration::from_millis(10)).fps() - 100.0).abs() < 1e-6);
        assert_eq!(DeltaTime(0.0).fps(), 0.0);
    }

    #[test]
    fn test_frame_stats_smoothing() {
        let stats = FrameStats::INITIAL.observe(30.0, 0.9, 30.0);
        assert!((stats.smoothed_fps - 57.0).abs() < 1e-9);
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.low_frame_count, 0);
    }

    #[test]
    fn test_low_frame_counter_saturates() {
        let mut stats = FrameStats::INITIAL;
        for _ in 0..3 {
            stats = stats.observe(10.0, 0.9, 30.0);
        }
        assert_eq!(stats.low_frame_count, 3);

        for _ in 0..5 {
            stats = stats.observe(60.0, 0.9, 30.0);
        }
        assert_eq!(stats.low_frame_count, 0);
    }

    #[test]
    fn test_observe_leaves_input_untouched() {
        let stats = FrameStats::INITIAL;
        assert_eq!(stats.observe(24.0, 0.9, 30.0), stats.observe(24.0, 0.9, 30.0));
        assert_eq!(stats, FrameStats::INITIAL);
    }

    #[test]
    fn test_phase_timer_laps() {
        let mut timer = PhaseTimer::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.lap_millis() >= 5.0);
        assert!(timer.lap_millis() < 5.0);
    }
}
