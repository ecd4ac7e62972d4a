//! Mesh and Geometry
//!
//! Flat vertex/index buffers handed to the rendering engine, with LOD support.

use bitflags::bitflags;
use glam::Vec3;
use vasculo_core::{Aabb, ModelPlacement, Rgb};

use crate::lod::LodVariant;
use crate::{RendererError, RendererResult};

bitflags! {
    /// Vertex attributes present in a mesh
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexAttributes: u8 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const COLOR = 1 << 2;
    }
}

/// Primitive topology of the index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Three indices per triangle
    Triangles,
    /// Two indices per line segment
    Lines,
    /// One index per point
    Points,
}

impl Topology {
    /// Indices consumed by one primitive
    pub fn indices_per_primitive(&self) -> usize {
        match self {
            Self::Triangles => 3,
            Self::Lines => 2,
            Self::Points => 1,
        }
    }
}

/// Mesh data
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Mesh name
    pub name: String,
    /// Primitive topology
    pub topology: Topology,
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals (empty for lines and points)
    pub normals: Vec<[f32; 3]>,
    /// Vertex colors
    pub colors: Vec<Rgb>,
    /// Primitive indices
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new(name: impl Into<String>, topology: Topology) -> Self {
        Self {
            name: name.into(),
            topology,
            positions: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create an empty mesh with reserved capacity
    pub fn with_capacity(name: impl Into<String>, topology: Topology, vertices: usize, indices: usize) -> Self {
        let with_normals = topology == Topology::Triangles;
        Self {
            name: name.into(),
            topology,
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(if with_normals { vertices } else { 0 }),
            colors: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    /// Append a vertex, returning its index
    pub fn push_vertex(&mut self, position: Vec3, normal: Option<Vec3>, color: Rgb) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        if let Some(normal) = normal {
            self.normals.push(normal.to_array());
        }
        self.colors.push(color);
        index
    }

    /// Attributes with one entry per vertex
    pub fn attributes(&self) -> VertexAttributes {
        let count = self.positions.len();
        let mut attributes = VertexAttributes::POSITION;
        if count > 0 && self.normals.len() == count {
            attributes |= VertexAttributes::NORMAL;
        }
        if count > 0 && self.colors.len() == count {
            attributes |= VertexAttributes::COLOR;
        }
        attributes
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of primitives (triangles, lines or points)
    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.topology.indices_per_primitive()
    }

    /// Number of triangles (zero for non-triangle topologies)
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.primitive_count(),
            _ => 0,
        }
    }

    /// Whether the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Bounds of the vertex positions
    pub fn bounds(&self) -> Aabb {
        Aabb::from_positions(&self.positions)
    }

    /// Apply a center-and-scale placement to the positions.
    ///
    /// Normals are unaffected: the placement is a uniform scale plus translation.
    pub fn apply_placement(&mut self, placement: &ModelPlacement) {
        placement.apply_to_positions(&mut self.positions);
    }

    /// Replace every vertex color
    pub fn fill_color(&mut self, color: Rgb) {
        self.colors.clear();
        self.colors.resize(self.positions.len(), color);
    }

    /// Check buffer consistency
    pub fn validate(&self) -> RendererResult<()> {
        let count = self.positions.len();
        if count > u32::MAX as usize {
            return Err(RendererError::InvalidMesh(format!("{} vertices exceed 32-bit indices", count)));
        }
        if !self.normals.is_empty() && self.normals.len() != count {
            return Err(RendererError::InvalidMesh(format!(
                "{} normals for {} vertices",
                self.normals.len(),
                count
            )));
        }
        if !self.colors.is_empty() && self.colors.len() != count {
            return Err(RendererError::InvalidMesh(format!(
                "{} colors for {} vertices",
                self.colors.len(),
                count
            )));
        }
        if self.indices.len() % self.topology.indices_per_primitive() != 0 {
            return Err(RendererError::InvalidMesh(format!(
                "{} indices do not form whole {:?} primitives",
                self.indices.len(),
                self.topology
            )));
        }
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(RendererError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad, count
            )));
        }
        Ok(())
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new("", Topology::Triangles)
    }
}

/// Mesh LOD level
#[derive(Debug, Clone)]
pub struct MeshLod {
    /// LOD index, 0 is the most detailed
    pub level: u32,
    /// Detail parameters the mesh was built with
    pub variant: LodVariant,
    /// Merged geometry for this level
    pub mesh: Mesh,
}

impl MeshLod {
    /// Camera distance up to which this level is used
    pub fn distance(&self) -> f32 {
        self.variant.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(name: &str) -> Mesh {
        let mut mesh = Mesh::new(name, Topology::Triangles);
        for p in [Vec3::ZERO, Vec3::X, Vec3::Y] {
            mesh.push_vertex(p, Some(Vec3::Z), [1.0, 0.0, 0.0]);
        }
        mesh.indices.extend([0, 1, 2]);
        mesh
    }

    #[test]
    fn test_mesh_default() {
        let mesh = Mesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.attributes(), VertexAttributes::POSITION);
    }

    #[test]
    fn test_attributes() {
        let mesh = triangle("t");
        assert_eq!(mesh.attributes(), VertexAttributes::all());
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_out_of_range_index() {
        let mut mesh = triangle("t");
        mesh.indices[2] = 9;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_apply_placement() {
        let mut mesh = triangle("t");
        let placement = ModelPlacement::fit(&mesh.bounds(), 10.0);
        mesh.apply_placement(&placement);

        let bounds = mesh.bounds();
        assert!((bounds.max_dimension() - 10.0).abs() < 1e-4);
        assert!(bounds.center().length() < 1e-4);
    }
}
