//! Rendering surface
//!
//! The loader never renders. It hands finished meshes, materials and lights to
//! a [`RenderSurface`] owned by the host application.

use std::future::Future;

use ahash::AHashMap;
use vasculo_core::CameraPlacement;
use vasculo_renderer::{FrameYield, Light, LightingRig, Material, Mesh, Topology, VertexAttributes};

/// Handle to an object added to a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// LOD group membership of a mesh: the surface shows one level per batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodGroup {
    /// Batch the level belongs to
    pub batch: usize,
    /// Level index, 0 is the most detailed
    pub level: u32,
    /// Camera distance up to which the level is active
    pub distance: f32,
}

/// Scene graph the loader hands geometry to.
///
/// Implementations copy or upload what they need; the loader keeps ownership
/// of meshes and materials and removes them through [`RenderSurface::remove`].
pub trait RenderSurface: FrameYield {
    /// Add a mesh drawn with `material`
    fn add_mesh(&mut self, mesh: &Mesh, material: &Material, lod: Option<LodGroup>) -> SurfaceId;

    /// Remove a previously added mesh or light. Returns `false` for unknown ids.
    fn remove(&mut self, id: SurfaceId) -> bool;

    /// Add a light
    fn add_light(&mut self, light: &Light) -> SurfaceId;
}

/// Camera or view controller that receives placement suggestions
pub trait PlacementTarget {
    fn apply_camera(&mut self, camera: &CameraPlacement);
}

impl<F: FnMut(&CameraPlacement)> PlacementTarget for F {
    fn apply_camera(&mut self, camera: &CameraPlacement) {
        self(camera)
    }
}

/// Proof that the scene lighting was installed.
///
/// Only [`install_lighting`] creates one, and constructing a loader consumes
/// it, so lights are set up exactly once by whoever owns the surface.
#[derive(Debug)]
pub struct LightingInstalled {
    lights: Vec<SurfaceId>,
}

impl LightingInstalled {
    /// Surface ids of the installed lights
    pub fn lights(&self) -> &[SurfaceId] {
        &self.lights
    }
}

/// Add every light of `rig` to `surface`
pub fn install_lighting<S: RenderSurface>(surface: &mut S, rig: &LightingRig) -> LightingInstalled {
    let lights = rig.iter().map(|light| surface.add_light(light)).collect::<Vec<_>>();
    log::debug!("Installed {} lights", lights.len());
    LightingInstalled { lights }
}

/// What a headless surface remembers about an added mesh
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceObject {
    pub name: String,
    pub topology: Topology,
    /// Per-vertex buffers the mesh carries
    pub attributes: VertexAttributes,
    pub vertex_count: usize,
    pub primitive_count: usize,
    pub material_id: u64,
    pub material_name: String,
    /// Drawn with alpha blending
    pub transparent: bool,
    pub lod: Option<LodGroup>,
}

/// In-memory surface for tools and tests
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next_id: u64,
    objects: AHashMap<SurfaceId, SurfaceObject>,
    lights: AHashMap<SurfaceId, Light>,
    frames: u64,
}

impl HeadlessSurface {
    /// Empty surface with no lights
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> SurfaceId {
        self.next_id += 1;
        SurfaceId(self.next_id)
    }

    /// Mesh objects currently on the surface
    pub fn objects(&self) -> impl Iterator<Item = (&SurfaceId, &SurfaceObject)> {
        self.objects.iter()
    }

    /// Mesh object added under `id`
    pub fn object(&self, id: SurfaceId) -> Option<&SurfaceObject> {
        self.objects.get(&id)
    }

    /// Number of mesh objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of lights
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Frames yielded to this surface so far
    pub fn frames_yielded(&self) -> u64 {
        self.frames
    }

    /// Total vertices across every mesh object
    pub fn vertex_count(&self) -> usize {
        self.objects.values().map(|o| o.vertex_count).sum()
    }
}

impl FrameYield for HeadlessSurface {
    fn yield_frame(&mut self) -> impl Future<Output = ()> {
        self.frames += 1;
        tokio::task::yield_now()
    }
}

impl RenderSurface for HeadlessSurface {
    fn add_mesh(&mut self, mesh: &Mesh, material: &Material, lod: Option<LodGroup>) -> SurfaceId {
        let id = self.allocate();
        self.objects.insert(
            id,
            SurfaceObject {
                name: mesh.name.clone(),
                topology: mesh.topology,
                attributes: mesh.attributes(),
                vertex_count: mesh.vertex_count(),
                primitive_count: mesh.primitive_count(),
                material_id: material.id,
                material_name: material.name.clone(),
                transparent: material.is_transparent(),
                lod,
            },
        );
        id
    }

    fn remove(&mut self, id: SurfaceId) -> bool {
        self.objects.remove(&id).is_some() || self.lights.remove(&id).is_some()
    }

    fn add_light(&mut self, light: &Light) -> SurfaceId {
        let id = self.allocate();
        self.lights.insert(id, light.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_install_lighting() {
        let mut surface = HeadlessSurface::new();
        let installed = install_lighting(&mut surface, &LightingRig::standard(420.0));
        assert_eq!(installed.lights().len(), 4);
        assert_eq!(surface.light_count(), 4);
        assert_eq!(surface.object_count(), 0);
    }

    #[test]
    fn test_add_and_remove() {
        let mut surface = HeadlessSurface::new();
        let mut mesh = Mesh::new("points", Topology::Points);
        mesh.push_vertex(Vec3::ZERO, None, [1.0, 1.0, 1.0]);
        mesh.indices.push(0);

        let id = surface.add_mesh(&mesh, &Material::points([1.0; 3], 1.0, 4.0), None);
        let object = surface.object(id).unwrap();
        assert_eq!(object.vertex_count, 1);
        assert_eq!(object.attributes, VertexAttributes::POSITION | VertexAttributes::COLOR);
        assert!(!object.transparent);
        assert!(surface.remove(id));
        assert!(!surface.remove(id));
        assert_eq!(surface.object_count(), 0);
    }

    #[test]
    fn test_placement_target_closure() {
        let mut received = None;
        {
            let mut target = |camera: &CameraPlacement| received = Some(camera.distance());
            target.apply_camera(&CameraPlacement::suggest(100.0));
        }
        assert!(received.is_some());
    }

    #[tokio::test]
    async fn test_yield_counts_frames() {
        let mut surface = HeadlessSurface::new();
        surface.yield_frame().await;
        surface.yield_frame().await;
        assert_eq!(surface.frames_yielded(), 2);
    }
}
