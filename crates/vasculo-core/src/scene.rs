//! Model placement
//!
//! A loaded tree is centered on the origin and scaled uniformly so its
//! largest extent matches the requested model size. The camera suggestion is
//! derived from that size alone.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::Aabb;

/// Extents at or below this are not scaled
const MIN_FIT_EXTENT: f32 = 1e-9;

/// Center-and-scale mapping from file coordinates to scene coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPlacement {
    /// Bounds center in file coordinates, moved to the origin
    pub source_center: Vec3,
    pub scale: f32,
    /// Requested largest extent after placement
    pub target_size: f32,
}

impl ModelPlacement {
    pub const IDENTITY: Self = Self {
        source_center: Vec3::ZERO,
        scale: 1.0,
        target_size: 0.0,
    };

    /// Fit `bounds` to `target_size`.
    ///
    /// Empty bounds leave geometry untouched. Zero-extent bounds (a single
    /// distinct point) are centered without scaling.
    pub fn fit(bounds: &Aabb, target_size: f32) -> Self {
        if bounds.is_empty() {
            return Self {
                target_size,
                ..Self::IDENTITY
            };
        }

        let extent = bounds.max_dimension();
        let scale = if extent > MIN_FIT_EXTENT && target_size > 0.0 {
            target_size / extent
        } else {
            1.0
        };

        Self {
            source_center: bounds.center(),
            scale,
            target_size,
        }
    }

    /// Map a point from file to scene coordinates
    pub fn apply(&self, point: Vec3) -> Vec3 {
        (point - self.source_center) * self.scale
    }

    /// Scale a length such as a tube radius
    pub fn apply_length(&self, length: f32) -> f32 {
        length * self.scale
    }

    pub fn apply_to_positions(&self, positions: &mut [[f32; 3]]) {
        for position in positions.iter_mut() {
            *position = self.apply(Vec3::from_array(*position)).to_array();
        }
    }
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Camera suggested for viewing a placed model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPlacement {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Orbit limits for a view controller
    pub min_distance: f32,
    pub max_distance: f32,
}

impl CameraPlacement {
    /// Camera looking at the origin from slightly above, 1.5 model sizes away
    pub fn suggest(model_size: f32) -> Self {
        let size = if model_size > 0.0 { model_size } else { 1.0 };

        Self {
            position: Vec3::new(0.0, size * 0.25, size * 1.5),
            target: Vec3::ZERO,
            fov: 45.0,
            near: (size * 0.001).max(0.01),
            far: size * 20.0,
            min_distance: size * 0.1,
            max_distance: size * 5.0,
        }
    }

    /// Orbit distance of the suggested position
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_centers_and_scales() {
        let bounds = Aabb::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(30.0, 5.0, 2.0));
        let placement = ModelPlacement::fit(&bounds, 420.0);

        assert!((placement.scale - 21.0).abs() < 1e-4);
        assert!(placement.apply(bounds.center()).length() < 1e-4);

        let placed = Aabb::from_points(&[placement.apply(bounds.min), placement.apply(bounds.max)]);
        assert!((placed.max_dimension() - 420.0).abs() < 1e-3);
        assert!(placed.center().length() < 1e-3);
        assert!((placement.apply_length(0.5) - 10.5).abs() < 1e-4);
    }

    #[test]
    fn test_fit_degenerate_bounds() {
        let point = Vec3::new(3.0, 3.0, 3.0);
        let placement = ModelPlacement::fit(&Aabb::new(point, point), 100.0);
        assert_eq!(placement.scale, 1.0);
        assert_eq!(placement.apply(point), Vec3::ZERO);

        let empty = ModelPlacement::fit(&Aabb::EMPTY, 100.0);
        assert_eq!(empty.scale, 1.0);
        assert_eq!(empty.source_center, Vec3::ZERO);
    }

    #[test]
    fn test_apply_to_positions() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let placement = ModelPlacement::fit(&bounds, 4.0);
        let mut positions = [[0.0, 0.0, 0.0], [2.0, 2.0, 2.0]];
        placement.apply_to_positions(&mut positions);
        assert_eq!(positions, [[-2.0, -2.0, -2.0], [2.0, 2.0, 2.0]]);
    }

    #[test]
    fn test_camera_suggestion() {
        let camera = CameraPlacement::suggest(420.0);
        assert_eq!(camera.target, Vec3::ZERO);
        assert!(camera.distance() > 420.0);
        assert!(camera.near < camera.far);
        assert!(camera.min_distance < camera.max_distance);
        assert_eq!(CameraPlacement::suggest(-1.0), CameraPlacement::suggest(1.0));
    }
}
