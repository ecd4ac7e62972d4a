//! Adaptive performance control
//!
//! Frame times feed a smoothed frame rate. In [`PerformanceMode::Auto`] the
//! controller periodically degrades or improves the LOD settings used for the
//! next load. Fixed modes apply a preset and never adapt.

use vasculo_core::{DeltaTime, FrameStats, PerformanceMode};

use crate::lod::{LodSettings, LodVariant};
use crate::tube::{MAX_RADIAL_SEGMENTS, MIN_RADIAL_SEGMENTS};

/// Every constant the adaptation rules use
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveTuning {
    /// Weight of the previous smoothed frame rate
    pub ema_weight: f64,
    /// Frames below this rate count as low
    pub low_fps_threshold: f64,
    /// Degrade when the smoothed rate falls below this
    pub degrade_below_fps: f64,
    /// Degrade when more than this many low frames accumulate
    pub low_frame_limit: u32,
    /// Improve when the smoothed rate exceeds this and no low frames remain
    pub improve_above_fps: f64,

    /// Factor on radial segments when degrading (rounded down)
    pub degrade_segments: f32,
    /// Factor on radius scales when degrading
    pub degrade_radius: f32,
    /// Factor on the batch size when degrading
    pub degrade_batch: f32,
    /// Factor on radial segments when improving (rounded up)
    pub improve_segments: f32,
    /// Factor on radius scales when improving
    pub improve_radius: f32,
    /// Factor on the batch size when improving
    pub improve_batch: f32,

    /// Radial segment clamp
    pub min_segments: usize,
    pub max_segments: usize,
    /// Radius scale clamp
    pub min_radius_scale: f32,
    pub max_radius_scale: f32,
    /// Batch size clamp
    pub min_batch_size: usize,
    pub max_batch_size: usize,

    /// Frames between adaptation checks
    pub adjust_interval: u64,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self {
            ema_weight: 0.9,
            low_fps_threshold: 30.0,
            degrade_below_fps: 20.0,
            low_frame_limit: 10,
            improve_above_fps: 45.0,
            degrade_segments: 0.7,
            degrade_radius: 0.8,
            degrade_batch: 0.8,
            improve_segments: 1.1,
            improve_radius: 1.05,
            improve_batch: 1.1,
            min_segments: MIN_RADIAL_SEGMENTS,
            max_segments: MAX_RADIAL_SEGMENTS,
            min_radius_scale: 0.3,
            max_radius_scale: 1.5,
            min_batch_size: 100,
            max_batch_size: 5000,
            adjust_interval: 30,
        }
    }
}

/// Outcome of one adaptation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjustment {
    /// Detail was reduced
    Degraded,
    /// Detail was increased
    Improved,
    /// Settings kept, or no check ran
    Unchanged,
}

/// Decide whether to degrade, improve or keep `settings`.
///
/// Segment counts round down when degrading and up when improving, so a
/// step always moves unless a clamp is reached.
pub fn adapt(settings: &LodSettings, stats: &FrameStats, tuning: &AdaptiveTuning) -> (LodSettings, Adjustment) {
    let degrade =
        stats.smoothed_fps < tuning.degrade_below_fps || stats.low_frame_count > tuning.low_frame_limit;
    let improve = stats.smoothed_fps > tuning.improve_above_fps && stats.low_frame_count == 0;

    if degrade {
        let scaled = scale(settings, tuning, tuning.degrade_segments, tuning.degrade_radius, tuning.degrade_batch, f32::floor);
        (scaled, Adjustment::Degraded)
    } else if improve {
        let scaled = scale(settings, tuning, tuning.improve_segments, tuning.improve_radius, tuning.improve_batch, f32::ceil);
        (scaled, Adjustment::Improved)
    } else {
        (settings.clone(), Adjustment::Unchanged)
    }
}

fn scale(
    settings: &LodSettings,
    tuning: &AdaptiveTuning,
    segments: f32,
    radius: f32,
    batch: f32,
    round: fn(f32) -> f32,
) -> LodSettings {
    let variants = settings
        .variants
        .iter()
        .map(|v| LodVariant {
            segments: (round(v.segments as f32 * segments) as usize).clamp(tuning.min_segments, tuning.max_segments),
            radius_scale: (v.radius_scale * radius).clamp(tuning.min_radius_scale, tuning.max_radius_scale),
            distance: v.distance,
        })
        .collect();

    let batch_size =
        ((settings.batch_size as f32 * batch).round() as usize).clamp(tuning.min_batch_size, tuning.max_batch_size);

    LodSettings {
        variants,
        batch_size,
        capped: settings.capped,
    }
    .normalized()
}

/// LOD preset for a mode; [`PerformanceMode::Auto`] starts from Medium
pub fn preset(mode: PerformanceMode) -> LodSettings {
    match mode {
        PerformanceMode::High => LodSettings::new(
            [
                LodVariant::new(12, 1.0, 300.0),
                LodVariant::new(8, 0.95, 700.0),
                LodVariant::new(6, 0.9, 1400.0),
                LodVariant::new(4, 0.85, f32::INFINITY),
            ],
            1500,
        ),
        PerformanceMode::Low => LodSettings::new(
            [
                LodVariant::new(6, 0.9, 150.0),
                LodVariant::new(4, 0.8, 350.0),
                LodVariant::new(3, 0.7, 700.0),
                LodVariant::new(3, 0.6, f32::INFINITY),
            ],
            500,
        ),
        PerformanceMode::Medium | PerformanceMode::Auto => LodSettings::default(),
    }
}

/// Tracks frame rate and owns the LOD settings for the next load
#[derive(Debug, Clone)]
pub struct PerformanceController {
    mode: PerformanceMode,
    stats: FrameStats,
    tuning: AdaptiveTuning,
    settings: LodSettings,
    last_adjustment: Adjustment,
}

impl PerformanceController {
    /// Controller in `mode` with default tuning
    pub fn new(mode: PerformanceMode) -> Self {
        Self::with_tuning(mode, AdaptiveTuning::default())
    }

    /// Controller in `mode` with custom adaptation constants
    pub fn with_tuning(mode: PerformanceMode, tuning: AdaptiveTuning) -> Self {
        Self {
            mode,
            stats: FrameStats::INITIAL,
            tuning,
            settings: preset(mode),
            last_adjustment: Adjustment::Unchanged,
        }
    }

    /// Switch mode, resetting settings to its preset and clearing statistics
    pub fn set_mode(&mut self, mode: PerformanceMode) {
        if mode == self.mode {
            return;
        }
        log::info!("Performance mode changed to {:?}", mode);
        self.mode = mode;
        self.settings = preset(mode);
        self.stats = FrameStats::INITIAL;
        self.last_adjustment = Adjustment::Unchanged;
    }

    /// Record a frame duration, adapting every `adjust_interval` frames.
    /// Non-positive deltas carry no rate and are ignored.
    pub fn record_frame(&mut self, delta: DeltaTime) -> Adjustment {
        if !(delta.0 > 0.0) {
            return Adjustment::Unchanged;
        }
        self.observe_fps(delta.fps())
    }

    /// Record an instantaneous frame rate sample; zero, negative and
    /// non-finite samples are ignored
    pub fn observe_fps(&mut self, fps: f64) -> Adjustment {
        if !fps.is_finite() || fps <= 0.0 {
            return Adjustment::Unchanged;
        }
        self.stats = self
            .stats
            .observe(fps, self.tuning.ema_weight, self.tuning.low_fps_threshold);

        let interval = self.tuning.adjust_interval.max(1);
        if self.stats.frames % interval == 0 {
            self.tick()
        } else {
            Adjustment::Unchanged
        }
    }

    /// Run one adaptation check now (no-op outside Auto)
    pub fn tick(&mut self) -> Adjustment {
        if !self.mode.is_adaptive() {
            return Adjustment::Unchanged;
        }

        let (settings, adjustment) = adapt(&self.settings, &self.stats, &self.tuning);
        if adjustment != Adjustment::Unchanged && settings != self.settings {
            log::debug!(
                "{:?} LOD settings at {:.1} fps: {:?}",
                adjustment,
                self.stats.smoothed_fps,
                settings.variants
            );
        }
        self.settings = settings;
        self.last_adjustment = adjustment;
        adjustment
    }

    /// Settings the next load should use
    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    /// Smoothed frame statistics since the last mode change
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Active performance mode
    pub fn mode(&self) -> PerformanceMode {
        self.mode
    }

    /// Adaptation constants in use
    pub fn tuning(&self) -> &AdaptiveTuning {
        &self.tuning
    }

    /// Outcome of the most recent check
    pub fn last_adjustment(&self) -> Adjustment {
        self.last_adjustment
    }
}

impl Default for PerformanceController {
    fn default() -> Self {
        Self::new(PerformanceMode::Auto)
    }
}
