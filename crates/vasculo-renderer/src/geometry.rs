//! Geometry synthesis
//!
//! Turns parsed polydata into renderable primitives: line segments, a point
//! cloud fallback, or a segment list ready for tube synthesis.

use glam::Vec3;
use vasculo_assets::{PolyData, ScalarRange};
use vasculo_core::{ModelPlacement, Rgb};

use crate::colormap::PressureColormap;
use crate::mesh::{Mesh, Topology};

/// Radius used for points without a radius value
pub const DEFAULT_RADIUS: f32 = 0.1;
/// Segments shorter than this are dropped
pub const MIN_SEGMENT_LENGTH: f32 = 1e-6;
/// Segments whose radii are both below this are dropped in tube mode
pub const MIN_SEGMENT_RADIUS: f32 = 1e-6;

/// How a model is rendered, decided once from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// One line primitive per segment
    #[default]
    Lines,
    /// Unconnected points
    Points,
    /// Tapered tubes with LOD batching
    Tubes,
}

/// Renderable unit between two adjacent polyline points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
    pub start_radius: f32,
    pub end_radius: f32,
    pub start_color: Rgb,
    pub end_color: Rgb,
}

impl Segment {
    /// Segment length
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Midpoint of the segment
    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    /// Larger of the two radii
    pub fn max_radius(&self) -> f32 {
        self.start_radius.max(self.end_radius)
    }

    /// Apply a model placement to endpoints and radii
    pub fn placed(&self, placement: &ModelPlacement) -> Segment {
        Segment {
            start: placement.apply(self.start),
            end: placement.apply(self.end),
            start_radius: placement.apply_length(self.start_radius),
            end_radius: placement.apply_length(self.end_radius),
            ..*self
        }
    }
}

/// Options for segment extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentOptions {
    /// Radius for points missing from the radius field
    pub default_radius: f32,
    /// Minimum segment length
    pub min_length: f32,
    /// Minimum radius; `None` disables the radius filter
    pub min_radius: Option<f32>,
    /// Color used when there is no pressure field
    pub base_color: Rgb,
    /// Pressure colormap
    pub colormap: PressureColormap,
}

impl SegmentOptions {
    /// Options for the given render mode; only tubes filter by radius
    pub fn for_mode(mode: RenderMode, base_color: Rgb) -> Self {
        Self {
            min_radius: (mode == RenderMode::Tubes).then_some(MIN_SEGMENT_RADIUS),
            base_color,
            ..Self::default()
        }
    }

    fn is_degenerate(&self, segment: &Segment) -> bool {
        if !segment.start.is_finite() || !segment.end.is_finite() {
            return true;
        }
        if segment.length() < self.min_length {
            return true;
        }
        match self.min_radius {
            Some(min) => segment.start_radius < min && segment.end_radius < min,
            None => false,
        }
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            default_radius: DEFAULT_RADIUS,
            min_length: MIN_SEGMENT_LENGTH,
            min_radius: Some(MIN_SEGMENT_RADIUS),
            base_color: [0.8, 0.2, 0.2],
            colormap: PressureColormap::DEFAULT,
        }
    }
}

/// Extracted segments plus extraction diagnostics
#[derive(Debug, Clone, Default)]
pub struct SegmentSet {
    pub segments: Vec<Segment>,
    /// Pairs dropped as too short or too thin
    pub skipped_degenerate: usize,
    /// Pairs referencing points that were never read
    pub skipped_out_of_range: usize,
    /// Observed pressure range used for coloring
    pub pressure_range: Option<ScalarRange>,
}

impl SegmentSet {
    /// Number of usable segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether no usable segment was found
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Walk every cell's consecutive index pairs and build segments.
///
/// Indices are bounds-checked against the points actually read, so a
/// truncated point section drops the affected pairs instead of failing.
pub fn extract_segments(data: &PolyData, options: &SegmentOptions) -> SegmentSet {
    let radius = data.radius();
    let pressure = data.pressure();
    let pressure_range = pressure.and_then(|field| field.range());

    let color_at = |index: usize| -> Rgb {
        match (pressure, pressure_range) {
            (Some(field), Some(range)) => match field.get(index) {
                Some(p) => options.colormap.color(p, range.min, range.max),
                None => options.base_color,
            },
            _ => options.base_color,
        }
    };
    let radius_at = |index: usize| -> f32 {
        radius
            .map(|field| field.value_or(index, options.default_radius))
            .unwrap_or(options.default_radius)
    };

    let mut set = SegmentSet {
        segments: Vec::with_capacity(data.segment_pair_count()),
        pressure_range,
        ..SegmentSet::default()
    };

    for cell in &data.cells {
        for (a, b) in cell.segments() {
            let (a, b) = (a as usize, b as usize);
            let (Some(&start), Some(&end)) = (data.points.get(a), data.points.get(b)) else {
                set.skipped_out_of_range += 1;
                continue;
            };

            let segment = Segment {
                start,
                end,
                start_radius: radius_at(a),
                end_radius: radius_at(b),
                start_color: color_at(a),
                end_color: color_at(b),
            };

            if options.is_degenerate(&segment) {
                set.skipped_degenerate += 1;
                continue;
            }
            set.segments.push(segment);
        }
    }

    if set.skipped_out_of_range > 0 {
        log::warn!(
            "{} segments reference missing points and were skipped",
            set.skipped_out_of_range
        );
    }
    log::debug!(
        "Extracted {} segments ({} degenerate dropped)",
        set.segments.len(),
        set.skipped_degenerate
    );

    set
}

/// Line-segment buffer: two vertices per segment
pub fn line_mesh(name: impl Into<String>, segments: &[Segment]) -> Mesh {
    let mut mesh = Mesh::with_capacity(name, Topology::Lines, segments.len() * 2, segments.len() * 2);
    for segment in segments {
        let a = mesh.push_vertex(segment.start, None, segment.start_color);
        let b = mesh.push_vertex(segment.end, None, segment.end_color);
        mesh.indices.extend([a, b]);
    }
    mesh
}

/// Point cloud of the raw point set
pub fn point_cloud(name: impl Into<String>, points: &[Vec3], colors: impl Fn(usize) -> Rgb) -> Mesh {
    let mut mesh = Mesh::with_capacity(name, Topology::Points, points.len(), points.len());
    for (i, point) in points.iter().enumerate() {
        let index = mesh.push_vertex(*point, None, colors(i));
        mesh.indices.push(index);
    }
    mesh
}

/// Center the mesh at the origin and scale its largest dimension to `model_size`
pub fn fit_mesh(mesh: &mut Mesh, model_size: f32) -> ModelPlacement {
    let placement = ModelPlacement::fit(&mesh.bounds(), model_size);
    mesh.apply_placement(&placement);
    placement
}
