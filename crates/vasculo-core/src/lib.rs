//! # Vasculo Core
//!
//! Foundational types shared by the Vasculo vascular mesh pipeline.
//!
//! This crate provides:
//! - **Math**: Bounding volumes and interpolation helpers on top of glam
//! - **Time**: Frame-rate smoothing and load phase timing
//! - **Scene**: Fit-to-size model placement and camera suggestions

pub mod math;
pub mod scene;
pub mod time;

pub use math::{Aabb, BoundingSphere};
pub use scene::{CameraPlacement, ModelPlacement};
pub use time::{DeltaTime, FrameStats, PhaseTimer};

use serde::{Deserialize, Serialize};

/// Rendering performance mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    /// Dense tessellation, large batches
    High,
    /// Balanced defaults
    Medium,
    /// Coarse tessellation for weak devices
    Low,
    /// Start balanced and adapt to the measured frame rate
    #[default]
    Auto,
}

impl PerformanceMode {
    /// Whether frame-rate driven adaptation is enabled in this mode
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// Linear RGB color with components in `[0, 1]`
pub type Rgb = [f32; 3];
