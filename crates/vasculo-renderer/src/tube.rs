//! Tapered tube (frustum) synthesis.
//!
//! Each segment becomes a frustum: two rings of radial vertices joined by a
//! side wall, optionally closed with end caps. The frustum is built around
//! the local +Y axis and rotated onto the segment direction.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use vasculo_core::Rgb;

use crate::geometry::{Segment, MIN_SEGMENT_LENGTH, MIN_SEGMENT_RADIUS};
use crate::mesh::{Mesh, Topology};

/// Minimum radial vertex count for a closed ring
pub const MIN_RADIAL_SEGMENTS: usize = 3;
/// Maximum radial vertex count per ring
pub const MAX_RADIAL_SEGMENTS: usize = 32;

/// Directions closer than this to the local up axis use the substitute axis
const PARALLEL_EPSILON: f32 = 1e-6;

/// Tessellation and sizing of generated tubes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeStyle {
    /// Radial vertices per ring
    pub radial_segments: usize,
    /// Multiplier applied to both radii
    pub radius_scale: f32,
    /// Close the frustum with end caps
    pub capped: bool,
}

impl TubeStyle {
    /// Style with the given tessellation and radius scale, capped
    pub fn new(radial_segments: usize, radius_scale: f32) -> Self {
        Self {
            radial_segments,
            radius_scale,
            capped: true,
        }
    }

    /// Radial vertex count actually used
    pub fn ring_size(&self) -> usize {
        self.radial_segments.clamp(MIN_RADIAL_SEGMENTS, MAX_RADIAL_SEGMENTS)
    }

    /// Upper bound on vertices per frustum
    pub fn vertices_per_segment(&self) -> usize {
        let n = self.ring_size();
        if self.capped { 4 * n + 2 } else { 2 * n }
    }

    /// Upper bound on indices per frustum
    pub fn indices_per_segment(&self) -> usize {
        let n = self.ring_size();
        if self.capped { 12 * n } else { 6 * n }
    }
}

impl Default for TubeStyle {
    fn default() -> Self {
        Self::new(8, 1.0)
    }
}

/// Rotation taking the local +Y axis onto `direction` (unit length).
///
/// Near-parallel directions would make the shortest-arc rotation unstable, so
/// the rotation goes through +Z instead.
pub fn frustum_rotation(direction: Vec3) -> Quat {
    let alignment = direction.dot(Vec3::Y);
    if alignment.abs() > 1.0 - PARALLEL_EPSILON {
        Quat::from_rotation_arc(Vec3::Z, direction) * Quat::from_rotation_arc(Vec3::Y, Vec3::Z)
    } else {
        Quat::from_rotation_arc(Vec3::Y, direction)
    }
}

/// Append one frustum to `mesh`. Returns `false` when the segment is degenerate
/// and nothing was added.
pub fn append_frustum(mesh: &mut Mesh, segment: &Segment, style: &TubeStyle) -> bool {
    debug_assert_eq!(mesh.topology, Topology::Triangles);

    let axis = segment.end - segment.start;
    let length = axis.length();
    if !length.is_finite() || length < MIN_SEGMENT_LENGTH {
        return false;
    }

    let r0 = (segment.start_radius * style.radius_scale).max(0.0);
    let r1 = (segment.end_radius * style.radius_scale).max(0.0);
    if !(r0.is_finite() && r1.is_finite()) || (r0 < MIN_SEGMENT_RADIUS && r1 < MIN_SEGMENT_RADIUS) {
        return false;
    }

    let direction = axis / length;
    let rotation = frustum_rotation(direction);
    let n = style.ring_size();

    let radials: Vec<Vec3> = (0..n)
        .map(|i| {
            let angle = TAU * i as f32 / n as f32;
            rotation * Vec3::new(angle.sin(), 0.0, angle.cos())
        })
        .collect();

    // Side normals tilt along the axis by the taper slope
    let side_base = mesh.vertex_count() as u32;
    push_ring(mesh, segment.start, &radials, r0, length, direction, r0 - r1, segment.start_color);
    push_ring(mesh, segment.end, &radials, r1, length, direction, r0 - r1, segment.end_color);

    let n32 = n as u32;
    for i in 0..n32 {
        let next = (i + 1) % n32;
        let a = side_base + i;
        let b = side_base + next;
        let c = side_base + n32 + i;
        let d = side_base + n32 + next;
        mesh.indices.extend([a, b, c, b, d, c]);
    }

    if style.capped {
        if r0 >= MIN_SEGMENT_RADIUS {
            push_cap(mesh, segment.start, &radials, r0, -direction, segment.start_color, false);
        }
        if r1 >= MIN_SEGMENT_RADIUS {
            push_cap(mesh, segment.end, &radials, r1, direction, segment.end_color, true);
        }
    }

    true
}

#[allow(clippy::too_many_arguments)]
fn push_ring(
    mesh: &mut Mesh,
    center: Vec3,
    radials: &[Vec3],
    radius: f32,
    length: f32,
    direction: Vec3,
    taper: f32,
    color: Rgb,
) {
    for radial in radials {
        let normal = (*radial * length + direction * taper).normalize_or(*radial);
        mesh.push_vertex(center + *radial * radius, Some(normal), color);
    }
}

fn push_cap(mesh: &mut Mesh, center: Vec3, radials: &[Vec3], radius: f32, normal: Vec3, color: Rgb, end: bool) {
    let hub = mesh.push_vertex(center, Some(normal), color);
    let rim = mesh.vertex_count() as u32;
    for radial in radials {
        mesh.push_vertex(center + *radial * radius, Some(normal), color);
    }

    let n = radials.len() as u32;
    for i in 0..n {
        let a = rim + i;
        let b = rim + (i + 1) % n;
        if end {
            mesh.indices.extend([hub, a, b]);
        } else {
            mesh.indices.extend([hub, b, a]);
        }
    }
}

/// Build one merged tube mesh for a run of segments
pub fn tube_mesh(name: impl Into<String>, segments: &[Segment], style: &TubeStyle) -> Mesh {
    let mut mesh = Mesh::with_capacity(
        name,
        Topology::Triangles,
        segments.len() * style.vertices_per_segment(),
        segments.len() * style.indices_per_segment(),
    );
    for segment in segments {
        append_frustum(&mut mesh, segment, style);
    }
    mesh
}
