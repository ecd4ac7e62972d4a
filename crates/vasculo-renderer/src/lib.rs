//! # Vasculo Renderer
//!
//! Geometry synthesis for vascular trees, producing plain mesh buffers for an
//! external rendering engine.
//!
//! ## Features
//! - Segment extraction from polyline cells with degenerate filtering
//! - Pressure-to-color mapping
//! - Line, point-cloud and tapered-tube (frustum) geometry
//! - Batched level-of-detail meshes built with cooperative yielding
//! - Frame-rate driven adaptation of LOD parameters
//! - Materials and a standard lighting rig

pub mod colormap;
pub mod geometry;
pub mod lighting;
pub mod lod;
pub mod material;
pub mod mesh;
pub mod performance;
pub mod tube;

pub use colormap::{pressure_to_color, PressureColormap};
pub use geometry::{RenderMode, Segment, SegmentOptions, SegmentSet};
pub use lighting::{Light, LightType, LightingRig};
pub use lod::{Batch, BatchedModel, BuildStats, FrameYield, LodBatcher, LodSettings, LodVariant, NoYield, TokioYield};
pub use material::{AlphaMode, Material};
pub use mesh::{Mesh, MeshLod, Topology, VertexAttributes};
pub use performance::{adapt, preset, Adjustment, AdaptiveTuning, PerformanceController};
pub use tube::TubeStyle;

use thiserror::Error;

/// Renderer errors
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Invalid LOD settings: {0}")]
    InvalidLod(String),

    #[error("Mesh buffers are inconsistent: {0}")]
    InvalidMesh(String),
}

/// Result type for renderer operations
pub type RendererResult<T> = Result<T, RendererError>;
