//! Loader configuration
//!
//! Deserialized from camelCase JSON. Older option names are accepted as
//! aliases (`enableTubeMesh`, `cylinderSegments`).

use serde::{Deserialize, Serialize};
use vasculo_core::{PerformanceMode, Rgb};
use vasculo_renderer::tube::MAX_RADIAL_SEGMENTS;
use vasculo_renderer::{LodSettings, RenderMode};

use crate::{LoaderError, LoaderResult};

/// Target largest dimension of a placed model
pub const DEFAULT_MODEL_SIZE: f32 = 420.0;
/// Radial tessellation the LOD presets are tuned for
pub const DEFAULT_TUBE_SEGMENTS: usize = 8;

/// RGB color, written as `"#rrggbb"`, `"#rgb"`, a packed `0xRRGGBB` integer
/// or an `[r, g, b]` array in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color(pub Rgb);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Packed(u32),
    Hex(String),
    Rgb([f32; 3]),
}

impl Color {
    /// Vessel red
    pub const DEFAULT: Self = Self([0.8, 0.2, 0.2]);

    /// Color from a packed `0xRRGGBB` value
    pub fn from_packed(value: u32) -> Self {
        let channel = |shift: u32| ((value >> shift) & 0xff) as f32 / 255.0;
        Self([channel(16), channel(8), channel(0)])
    }

    /// Parse `#rrggbb`, `#rgb` or `0xrrggbb`
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            6 => u32::from_str_radix(digits, 16).ok().map(Self::from_packed),
            3 => {
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16).ok().map(Self::from_packed)
            }
            _ => None,
        }
    }

    pub fn rgb(&self) -> Rgb {
        self.0
    }

    /// `#rrggbb` form
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Packed(value) if value <= 0xff_ffff => Ok(Self::from_packed(value)),
            ColorRepr::Packed(value) => Err(format!("color {value:#x} exceeds 0xffffff")),
            ColorRepr::Hex(text) => Self::from_hex(&text).ok_or_else(|| format!("invalid color '{text}'")),
            ColorRepr::Rgb(rgb) if rgb.iter().all(|c| c.is_finite()) => Ok(Self(rgb.map(|c| c.clamp(0.0, 1.0)))),
            ColorRepr::Rgb(rgb) => Err(format!("invalid color {rgb:?}")),
        }
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Options for one load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Label for the loaded model
    pub display_name: Option<String>,
    /// Base color when there is no pressure field
    pub color: Color,
    pub opacity: f32,
    /// Largest dimension of the placed model
    pub model_size: f32,
    /// Explicit line width; derived from the model size when absent
    pub line_width: Option<f32>,
    /// Explicit point size; derived from the model size when absent
    pub point_size: Option<f32>,
    /// Faint overlay over line geometry
    pub enable_wireframe: bool,
    /// Build tapered tubes instead of lines
    #[serde(alias = "enableTubeMesh")]
    pub use_cylinder_geometry: bool,
    /// Radial tessellation of the nearest LOD level
    #[serde(alias = "cylinderSegments")]
    pub tube_segments: usize,
    /// Radius multiplier of the nearest LOD level
    pub tube_radius_scale: f32,
    /// Mode applied at the start of the load; the loader's current mode when absent
    pub performance_mode: Option<PerformanceMode>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            color: Color::DEFAULT,
            opacity: 1.0,
            model_size: DEFAULT_MODEL_SIZE,
            line_width: None,
            point_size: None,
            enable_wireframe: false,
            use_cylinder_geometry: false,
            tube_segments: DEFAULT_TUBE_SEGMENTS,
            tube_radius_scale: 1.0,
            performance_mode: None,
        }
    }
}

impl LoaderConfig {
    /// Parse a JSON configuration object
    pub fn from_json(text: &str) -> LoaderResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| LoaderError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no load could use
    pub fn validate(&self) -> LoaderResult<()> {
        if !self.model_size.is_finite() || self.model_size <= 0.0 {
            return Err(LoaderError::InvalidConfig(format!(
                "modelSize must be positive, got {}",
                self.model_size
            )));
        }
        if self.tube_segments > MAX_RADIAL_SEGMENTS {
            return Err(LoaderError::InvalidConfig(format!(
                "tubeSegments must be at most {}, got {}",
                MAX_RADIAL_SEGMENTS, self.tube_segments
            )));
        }
        if !self.tube_radius_scale.is_finite() || self.tube_radius_scale <= 0.0 {
            return Err(LoaderError::InvalidConfig(format!(
                "tubeRadiusScale must be positive, got {}",
                self.tube_radius_scale
            )));
        }
        Ok(())
    }

    /// Primary geometry path; the point cloud is only ever a fallback
    pub fn render_mode(&self) -> RenderMode {
        if self.use_cylinder_geometry {
            RenderMode::Tubes
        } else {
            RenderMode::Lines
        }
    }

    /// Color used when the file has no pressure field
    pub fn base_color(&self) -> Rgb {
        self.color.rgb()
    }

    /// Opacity clamped to `[0, 1]`
    pub fn opacity(&self) -> f32 {
        if self.opacity.is_finite() { self.opacity.clamp(0.0, 1.0) } else { 1.0 }
    }

    /// Line width in pixels, at least 1
    pub fn line_width(&self) -> f32 {
        self.line_width
            .unwrap_or_else(|| (self.model_size / 70.0).round())
            .max(1.0)
    }

    /// Point size in pixels, at least 1
    pub fn point_size(&self) -> f32 {
        self.point_size
            .unwrap_or_else(|| (self.model_size / 17.0).round())
            .max(1.0)
    }

    /// Configured name, or the file name of `path`
    pub fn display_name<'a>(&'a self, path: &'a str) -> &'a str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => path.rsplit(['/', '\\']).next().unwrap_or(path),
        }
    }

    /// Apply the tube options on top of performance-controlled settings.
    ///
    /// `tubeSegments` and `tubeRadiusScale` are relative to the defaults, so a
    /// degraded or high-quality preset keeps its relative level of detail.
    pub fn lod_settings(&self, base: &LodSettings) -> LodSettings {
        let Some(near) = base.near() else {
            return base.normalized();
        };
        let factor = self.tube_segments as f32 / DEFAULT_TUBE_SEGMENTS as f32;
        let segments = (near.segments as f32 * factor).round() as usize;
        base.rebased(segments, near.radius_scale * self.tube_radius_scale)
    }
}
