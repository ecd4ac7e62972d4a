//! Math utilities
//!
//! Bounding volumes for model placement and LOD distance checks, plus the
//! interpolation helpers shared by the colormap.

pub use glam::Vec3;

use crate::Rgb;

/// Axis-aligned box. [`Aabb::EMPTY`] has inverted corners so that the first
/// included point defines it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box containing nothing
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box around `points`, skipping non-finite coordinates
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut aabb, point| {
            aabb.include(*point);
            aabb
        })
    }

    /// Smallest box around packed `[x, y, z]` vertex positions
    pub fn from_positions(positions: &[[f32; 3]]) -> Self {
        positions.iter().fold(Self::EMPTY, |mut aabb, p| {
            aabb.include(Vec3::from_array(*p));
            aabb
        })
    }

    /// Grow to contain `point`; non-finite points are ignored
    pub fn include(&mut self, point: Vec3) {
        if point.is_finite() {
            self.min = self.min.min(point);
            self.max = self.max.max(point);
        }
    }

    /// Midpoint of the corners
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest extent, zero for an empty box
    pub fn max_dimension(&self) -> f32 {
        if self.is_empty() { 0.0 } else { self.size().max_element() }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Union of two boxes
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Sphere around a batch, used to measure camera distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere through the corners of `aabb`; a zero sphere at the origin when empty
    pub fn from_aabb(aabb: &Aabb) -> Self {
        if aabb.is_empty() {
            return Self {
                center: Vec3::ZERO,
                radius: 0.0,
            };
        }
        Self {
            center: aabb.center(),
            radius: aabb.size().length() * 0.5,
        }
    }

    /// Distance from `viewer` to the center
    pub fn distance_to(&self, viewer: Vec3) -> f32 {
        viewer.distance(self.center)
    }
}

/// Linear interpolation
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Position of `value` within `a..b`; zero when the range is empty
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    let span = b - a;
    if span.abs() < f32::EPSILON { 0.0 } else { (value - a) / span }
}

/// Component-wise color interpolation
pub fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
    std::array::from_fn(|i| lerp(a[i], b[i], t))
}
