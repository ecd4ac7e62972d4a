//! Materials
//!
//! Surface descriptions handed to the rendering engine alongside each mesh.

use std::sync::atomic::{AtomicU64, Ordering};

use vasculo_core::Rgb;

use crate::geometry::RenderMode;

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Opacity of the wireframe overlay
pub const WIREFRAME_OPACITY: f32 = 0.15;

/// Alpha blending modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Blend,
}

impl AlphaMode {
    /// Blend for any opacity below one
    pub fn for_opacity(opacity: f32) -> Self {
        if opacity < 1.0 { Self::Blend } else { Self::Opaque }
    }
}

/// Surface description for one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Unique material ID
    pub id: u64,
    /// Base color, multiplied with vertex colors when enabled
    pub base_color: Rgb,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
    pub alpha_mode: AlphaMode,
    /// Use per-vertex colors
    pub vertex_colors: bool,
    /// Line width for line topology, in pixels
    pub line_width: f32,
    /// Point size for point topology, in pixels
    pub point_size: f32,
    /// Render back faces
    pub double_sided: bool,
    /// Draw triangle edges only
    pub wireframe: bool,
}

impl Material {
    /// Create a new material with a fresh ID
    pub fn new(name: impl Into<String>, base_color: Rgb, opacity: f32) -> Self {
        let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
        Self {
            name: name.into(),
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            base_color,
            opacity,
            alpha_mode: AlphaMode::for_opacity(opacity),
            vertex_colors: true,
            line_width: 1.0,
            point_size: 1.0,
            double_sided: false,
            wireframe: false,
        }
    }

    /// Lit, vertex-colored tube surface
    pub fn tube(base_color: Rgb, opacity: f32) -> Self {
        Self::new("vessel_tubes", base_color, opacity)
    }

    /// Vertex-colored line segments
    pub fn lines(base_color: Rgb, opacity: f32, line_width: f32) -> Self {
        Self {
            line_width,
            double_sided: true,
            ..Self::new("vessel_lines", base_color, opacity)
        }
    }

    /// Point cloud fallback
    pub fn points(base_color: Rgb, opacity: f32, point_size: f32) -> Self {
        Self {
            point_size,
            ..Self::new("vessel_points", base_color, opacity)
        }
    }

    /// Faint single-color overlay drawn over line geometry
    pub fn wireframe_overlay(base_color: Rgb) -> Self {
        Self {
            vertex_colors: false,
            wireframe: true,
            ..Self::new("vessel_wireframe", base_color, WIREFRAME_OPACITY)
        }
    }

    /// Material for the primary mesh of a render mode
    pub fn for_mode(mode: RenderMode, base_color: Rgb, opacity: f32, line_width: f32, point_size: f32) -> Self {
        match mode {
            RenderMode::Lines => Self::lines(base_color, opacity, line_width),
            RenderMode::Points => Self::points(base_color, opacity, point_size),
            RenderMode::Tubes => Self::tube(base_color, opacity),
        }
    }

    /// Whether the material needs blending
    pub fn is_transparent(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_ids_unique() {
        let a = Material::tube([1.0, 0.0, 0.0], 1.0);
        let b = Material::tube([1.0, 0.0, 0.0], 1.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_opacity_clamped() {
        let mat = Material::new("m", [1.0; 3], 1.7);
        assert_eq!(mat.opacity, 1.0);
        assert!(!mat.is_transparent());

        let mat = Material::new("m", [1.0; 3], -0.5);
        assert_eq!(mat.opacity, 0.0);
        assert!(mat.is_transparent());
    }

    #[test]
    fn test_mode_materials() {
        let lines = Material::for_mode(RenderMode::Lines, [0.5; 3], 0.8, 6.0, 25.0);
        assert_eq!(lines.line_width, 6.0);
        assert_eq!(lines.alpha_mode, AlphaMode::Blend);

        let points = Material::for_mode(RenderMode::Points, [0.5; 3], 1.0, 6.0, 25.0);
        assert_eq!(points.point_size, 25.0);
        assert!(points.vertex_colors);
    }

    #[test]
    fn test_wireframe_overlay() {
        let overlay = Material::wireframe_overlay([0.2, 0.4, 0.6]);
        assert!(overlay.wireframe);
        assert!(!overlay.vertex_colors);
        assert_eq!(overlay.opacity, WIREFRAME_OPACITY);
        assert!(overlay.is_transparent());
    }
}
