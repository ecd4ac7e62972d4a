//! Lighting
//!
//! The scene gets one fixed rig, scaled to the model size. Ambient fill keeps
//! the far side of vessels readable; the directional and point lights give
//! tubes their shading.

use glam::Vec3;
use smallvec::SmallVec;

/// Kind of light source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Uniform fill, no direction
    Ambient,
    /// Parallel rays toward the origin
    Directional,
    /// Omnidirectional with a falloff range
    Point,
}

/// A light handed to the render surface
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    /// Linear RGB
    pub color: Vec3,
    pub intensity: f32,
    /// Where the light sits; directional lights shine from here toward the origin
    pub position: Vec3,
    /// Falloff distance of point lights, infinite otherwise
    pub range: f32,
}

impl Light {
    /// Uniform fill light
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Ambient,
            color,
            intensity,
            position: Vec3::ZERO,
            range: f32::INFINITY,
        }
    }

    /// Light shining from `position` toward the origin
    pub fn directional(color: Vec3, intensity: f32, position: Vec3) -> Self {
        Self {
            light_type: LightType::Directional,
            color,
            intensity,
            position,
            range: f32::INFINITY,
        }
    }

    /// Light at `position` fading out over `range`
    pub fn point(color: Vec3, intensity: f32, position: Vec3, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            color,
            intensity,
            position,
            range,
        }
    }

    /// Direction the light travels, if it has one
    pub fn direction(&self) -> Option<Vec3> {
        match self.light_type {
            LightType::Directional => Some((-self.position).normalize_or(Vec3::NEG_Y)),
            _ => None,
        }
    }
}

/// Lights installed once per scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightingRig {
    pub lights: SmallVec<[Light; 4]>,
}

impl LightingRig {
    /// Ambient, key and rim lights placed relative to `model_size`
    pub fn standard(model_size: f32) -> Self {
        let size = if model_size.is_finite() && model_size > 0.0 { model_size } else { 1.0 };
        let mut lights = SmallVec::new();
        lights.push(Light::ambient(Vec3::ONE, 0.45));
        lights.push(Light::directional(Vec3::ONE, 0.9, Vec3::new(0.5, 1.0, 0.75) * size));
        lights.push(Light::directional(Vec3::new(0.8, 0.85, 1.0), 0.35, Vec3::new(-0.5, 0.25, -1.0) * size));
        lights.push(Light::point(Vec3::ONE, 0.3, Vec3::new(0.0, 0.5, 1.5) * size, size * 4.0));
        Self { lights }
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Lights in installation order
    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }
}
