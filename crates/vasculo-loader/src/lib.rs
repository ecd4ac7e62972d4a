//! # Vasculo Loader
//!
//! Loads a vascular tree from a VTK file and hands the resulting geometry to a
//! rendering surface.
//!
//! ## Features
//! - Fetch, parse, synthesize, batch and place in one async call
//! - Line, tube (batched LOD) and point-cloud fallback geometry
//! - One active model per loader; every load replaces the previous one
//! - Frame-rate driven LOD settings for the next load
//!
//! Lighting is installed by the surface owner before a loader exists:
//!
//! ```no_run
//! use vasculo_assets::FileFetcher;
//! use vasculo_loader::{install_lighting, HeadlessSurface, LoadCallbacks, LoaderConfig, VtkLoader};
//! use vasculo_renderer::LightingRig;
//!
//! # async fn run() -> vasculo_loader::LoaderResult<()> {
//! let mut surface = HeadlessSurface::new();
//! let lighting = install_lighting(&mut surface, &LightingRig::standard(420.0));
//! let mut loader = VtkLoader::new(FileFetcher::new(), surface, lighting);
//! let model = loader
//!     .load_file("tree.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
//!     .await?;
//! println!("{} segments", model.stats.segments);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod surface;

pub use config::{Color, LoaderConfig};
pub use surface::{
    install_lighting, HeadlessSurface, LightingInstalled, LodGroup, PlacementTarget, RenderSurface, SurfaceId,
    SurfaceObject,
};

use glam::Vec3;
use serde::Serialize;
use thiserror::Error;
use vasculo_assets::{vtk, AssetError, Fetcher, PolyData, ProgressSink, ScalarRange};
use vasculo_core::{Aabb, CameraPlacement, DeltaTime, ModelPlacement, PerformanceMode, PhaseTimer, Rgb};
use vasculo_renderer::geometry::{extract_segments, fit_mesh, line_mesh, point_cloud};
use vasculo_renderer::{
    Adjustment, BatchedModel, LodBatcher, Material, Mesh, PerformanceController, RenderMode, RendererError,
    SegmentOptions,
};

/// Loader errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Nothing to render in {0}")]
    EmptyModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Renderer(#[from] RendererError),
}

impl LoaderError {
    /// HTTP-style status code of a failed fetch
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Asset(err) => err.status(),
            _ => None,
        }
    }
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Caller hooks for one load
#[derive(Default)]
pub struct LoadCallbacks<'a> {
    /// Receives `(message, percent)` with percent in `0..=100`
    pub on_progress: Option<Box<dyn FnMut(&str, f32) + 'a>>,
    /// Receives the finished model
    pub on_complete: Option<Box<dyn FnMut(&LoadedModel) + 'a>>,
}

impl<'a> LoadCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive `(message, percent)` progress updates
    pub fn with_progress(mut self, f: impl FnMut(&str, f32) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Receive the model after a successful load
    pub fn with_complete(mut self, f: impl FnMut(&LoadedModel) + 'a) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    fn complete(&mut self, model: &LoadedModel) {
        if let Some(f) = self.on_complete.as_mut() {
            f(model);
        }
    }

    /// Sink mapping `0..=100` onto `start..=end`
    fn phase(&mut self, start: f32, end: f32) -> PhaseProgress<'_, 'a> {
        PhaseProgress {
            callbacks: self,
            start,
            end,
        }
    }
}

impl ProgressSink for LoadCallbacks<'_> {
    fn report(&mut self, message: &str, percent: f32) {
        if let Some(f) = self.on_progress.as_mut() {
            f(message, percent);
        }
    }
}

struct PhaseProgress<'c, 'a> {
    callbacks: &'c mut LoadCallbacks<'a>,
    start: f32,
    end: f32,
}

impl ProgressSink for PhaseProgress<'_, '_> {
    fn report(&mut self, message: &str, percent: f32) {
        let t = (percent / 100.0).clamp(0.0, 1.0);
        self.callbacks
            .report(message, self.start + (self.end - self.start) * t);
    }
}

/// Geometry of a loaded model, by render path
#[derive(Debug, Clone)]
pub enum ModelGeometry {
    /// Line segments with an optional faint overlay
    Lines { mesh: Mesh, wireframe: Option<Mesh> },
    /// Point cloud fallback
    Points { mesh: Mesh },
    /// Batched LOD tubes
    Tubes { batches: BatchedModel },
}

impl ModelGeometry {
    pub fn render_mode(&self) -> RenderMode {
        match self {
            Self::Lines { .. } => RenderMode::Lines,
            Self::Points { .. } => RenderMode::Points,
            Self::Tubes { .. } => RenderMode::Tubes,
        }
    }

    /// Every mesh of the model, all LOD levels included
    pub fn meshes(&self) -> Vec<&Mesh> {
        match self {
            Self::Lines { mesh, wireframe } => std::iter::once(mesh).chain(wireframe.as_ref()).collect(),
            Self::Points { mesh } => vec![mesh],
            Self::Tubes { batches } => batches
                .batches
                .iter()
                .flat_map(|batch| batch.levels.iter().map(|level| &level.mesh))
                .collect(),
        }
    }
}

/// Load statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Points declared by the file
    pub declared_points: usize,
    /// Points actually read
    pub points: usize,
    pub cells: usize,
    /// Segments kept after filtering
    pub segments: usize,
    pub skipped_segments: usize,
    pub vertices: usize,
    pub primitives: usize,
    pub batches: usize,
    pub parse_ms: f64,
    pub build_ms: f64,
}

/// The model produced by the last successful load
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    /// Path the model was fetched from
    pub source: String,
    pub geometry: ModelGeometry,
    pub materials: Vec<Material>,
    /// Per-point radius values, for legends
    pub radius: Vec<f32>,
    /// Per-point pressure values, for legends
    pub pressure: Vec<f32>,
    pub radius_range: Option<ScalarRange>,
    pub pressure_range: Option<ScalarRange>,
    /// Transform from file coordinates to scene coordinates
    pub placement: ModelPlacement,
    pub camera: CameraPlacement,
    pub stats: LoadStats,
    surface_ids: Vec<SurfaceId>,
}

impl LoadedModel {
    /// Whether the point-cloud fallback was used
    pub fn is_point_cloud(&self) -> bool {
        matches!(self.geometry, ModelGeometry::Points { .. })
    }

    pub fn render_mode(&self) -> RenderMode {
        self.geometry.render_mode()
    }

    /// Surface objects created for this model
    pub fn surface_ids(&self) -> &[SurfaceId] {
        &self.surface_ids
    }

    /// Bounds in scene coordinates
    pub fn bounds(&self) -> Aabb {
        self.geometry
            .meshes()
            .iter()
            .fold(Aabb::EMPTY, |acc, mesh| acc.merge(&mesh.bounds()))
    }
}

/// Built geometry plus the materials it is drawn with
struct Built {
    geometry: ModelGeometry,
    materials: Vec<Material>,
    placement: ModelPlacement,
}

/// Loads VTK files into a rendering surface, one model at a time
pub struct VtkLoader<F: Fetcher, S: RenderSurface> {
    fetcher: F,
    surface: S,
    lighting: LightingInstalled,
    performance: PerformanceController,
    placement_target: Option<Box<dyn PlacementTarget>>,
    current: Option<LoadedModel>,
}

impl<F: Fetcher, S: RenderSurface> VtkLoader<F, S> {
    /// Create a loader for a surface whose lighting is already installed
    pub fn new(fetcher: F, surface: S, lighting: LightingInstalled) -> Self {
        Self {
            fetcher,
            surface,
            lighting,
            performance: PerformanceController::default(),
            placement_target: None,
            current: None,
        }
    }

    /// Fetch, parse and build `path`, replacing the current model.
    ///
    /// Fails only when the fetch fails, the configuration is invalid, or no
    /// renderable point was read. Everything else degrades: malformed input
    /// is skipped and a file without usable segments becomes a point cloud.
    pub async fn load_file(
        &mut self,
        path: &str,
        config: &LoaderConfig,
        callbacks: &mut LoadCallbacks<'_>,
    ) -> LoaderResult<&LoadedModel> {
        config.validate()?;
        self.dispose();
        if let Some(mode) = config.performance_mode {
            self.performance.set_mode(mode);
        }

        callbacks.report("Loading file", 0.0);
        let text = self.fetcher.fetch(path).await.inspect_err(|err| {
            log::error!("Failed to load {}: {}", path, err);
        })?;

        let mut timer = PhaseTimer::start();
        let data = vtk::parse(&text, &mut callbacks.phase(0.0, 30.0));
        drop(text);
        let parse_ms = timer.lap_millis();

        if data.is_empty() {
            log::error!("No points parsed from {}", path);
            return Err(AssetError::NoPoints(path.to_string()).into());
        }

        let mode = config.render_mode();
        let options = SegmentOptions::for_mode(mode, config.base_color());

        callbacks.report("Generating geometry", 30.0);
        let set = extract_segments(&data, &options);
        let skipped_segments = set.skipped_degenerate + set.skipped_out_of_range;
        let segment_count = set.len();

        let built = if set.is_empty() {
            log::warn!("{}: no usable segments, falling back to a point cloud", path);
            Self::build_point_cloud(path, &data, &options, config)?
        } else {
            match mode {
                RenderMode::Tubes => {
                    callbacks.report("Building LOD batches", 60.0);
                    self.build_tubes(&set.segments, config, callbacks).await?
                }
                RenderMode::Lines | RenderMode::Points => Self::build_lines(&set.segments, config),
            }
        };
        for mesh in built.geometry.meshes() {
            mesh.validate()?;
        }
        callbacks.report("Placing model", 95.0);

        let camera = CameraPlacement::suggest(config.model_size);
        let surface_ids = self.hand_off(&built);
        if let Some(target) = self.placement_target.as_mut() {
            target.apply_camera(&camera);
        }

        let meshes = built.geometry.meshes();
        let stats = LoadStats {
            declared_points: data.point_count,
            points: data.points.len(),
            cells: data.cells.len(),
            segments: segment_count,
            skipped_segments,
            vertices: meshes.iter().map(|m| m.vertex_count()).sum(),
            primitives: meshes.iter().map(|m| m.primitive_count()).sum(),
            batches: match &built.geometry {
                ModelGeometry::Tubes { batches } => batches.batches.len(),
                _ => 0,
            },
            parse_ms,
            build_ms: timer.lap_millis(),
        };

        let radius = data.radius().map(|f| f.values.clone()).unwrap_or_default();
        let pressure = data.pressure().map(|f| f.values.clone()).unwrap_or_default();
        let model = LoadedModel {
            name: config.display_name(path).to_string(),
            source: path.to_string(),
            radius_range: ScalarRange::of(&radius),
            pressure_range: set.pressure_range,
            radius,
            pressure,
            geometry: built.geometry,
            materials: built.materials,
            placement: built.placement,
            camera,
            stats,
            surface_ids,
        };

        log::info!(
            "Loaded {} as {:?}: {} points, {} segments, {} vertices",
            model.name,
            model.render_mode(),
            model.stats.points,
            model.stats.segments,
            model.stats.vertices
        );

        callbacks.report("Complete", 100.0);
        let model = &*self.current.insert(model);
        callbacks.complete(model);
        Ok(model)
    }

    fn build_lines(segments: &[vasculo_renderer::Segment], config: &LoaderConfig) -> Built {
        let mut mesh = line_mesh("vessel_lines", segments);
        let placement = fit_mesh(&mut mesh, config.model_size);
        let mut materials = vec![Self::primary_material(config, RenderMode::Lines)];

        let wireframe = config.enable_wireframe.then(|| {
            let mut overlay = mesh.clone();
            overlay.name = "vessel_wireframe".to_string();
            overlay.fill_color(config.base_color());
            materials.push(Material::wireframe_overlay(config.base_color()));
            overlay
        });

        Built {
            geometry: ModelGeometry::Lines { mesh, wireframe },
            materials,
            placement,
        }
    }

    fn build_point_cloud(
        path: &str,
        data: &PolyData,
        options: &SegmentOptions,
        config: &LoaderConfig,
    ) -> LoaderResult<Built> {
        let bounds = data.bounds();
        if bounds.is_empty() {
            return Err(LoaderError::EmptyModel(path.to_string()));
        }

        let pressure = data.pressure().zip(data.pressure().and_then(|f| f.range()));
        let color_at = |index: usize| -> Rgb {
            pressure
                .and_then(|(field, range)| field.get(index).map(|p| options.colormap.color(p, range.min, range.max)))
                .unwrap_or(options.base_color)
        };

        let finite: Vec<(usize, Vec3)> = data
            .points
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .collect();
        let positions: Vec<Vec3> = finite.iter().map(|(_, p)| *p).collect();
        let mut mesh = point_cloud("vessel_points", &positions, |i| color_at(finite[i].0));
        let placement = fit_mesh(&mut mesh, config.model_size);

        Ok(Built {
            geometry: ModelGeometry::Points { mesh },
            materials: vec![Self::primary_material(config, RenderMode::Points)],
            placement,
        })
    }

    async fn build_tubes(
        &mut self,
        segments: &[vasculo_renderer::Segment],
        config: &LoaderConfig,
        callbacks: &mut LoadCallbacks<'_>,
    ) -> LoaderResult<Built> {
        let bounds = Aabb::from_points(segments.iter().flat_map(|s| [&s.start, &s.end]));
        let placement = ModelPlacement::fit(&bounds, config.model_size);
        let placed: Vec<_> = segments.iter().map(|s| s.placed(&placement)).collect();

        let settings = config.lod_settings(self.performance.settings());
        settings.validate()?;
        let batcher = LodBatcher::new(&settings);
        let batches = batcher
            .build(&placed, &mut self.surface, &mut callbacks.phase(60.0, 95.0))
            .await;

        Ok(Built {
            geometry: ModelGeometry::Tubes { batches },
            materials: vec![Self::primary_material(config, RenderMode::Tubes)],
            placement,
        })
    }

    fn primary_material(config: &LoaderConfig, mode: RenderMode) -> Material {
        Material::for_mode(mode, config.base_color(), config.opacity(), config.line_width(), config.point_size())
    }

    /// Add the model's meshes to the surface, pairing each with its material
    fn hand_off(&mut self, built: &Built) -> Vec<SurfaceId> {
        let mut ids = Vec::new();
        match &built.geometry {
            ModelGeometry::Lines { mesh, wireframe } => {
                ids.push(self.surface.add_mesh(mesh, &built.materials[0], None));
                if let (Some(overlay), Some(material)) = (wireframe, built.materials.get(1)) {
                    ids.push(self.surface.add_mesh(overlay, material, None));
                }
            }
            ModelGeometry::Points { mesh } => {
                ids.push(self.surface.add_mesh(mesh, &built.materials[0], None));
            }
            ModelGeometry::Tubes { batches } => {
                for batch in &batches.batches {
                    for level in &batch.levels {
                        let lod = LodGroup {
                            batch: batch.index,
                            level: level.level,
                            distance: level.distance(),
                        };
                        ids.push(self.surface.add_mesh(&level.mesh, &built.materials[0], Some(lod)));
                    }
                }
            }
        }
        ids
    }

    /// Remove the current model from the surface and drop its meshes and materials
    pub fn dispose(&mut self) {
        if let Some(model) = self.current.take() {
            let removed = model
                .surface_ids
                .iter()
                .filter(|id| self.surface.remove(**id))
                .count();
            log::debug!("Disposed {} ({} surface objects)", model.name, removed);
        }
    }

    /// Bind the camera controller that receives placement suggestions
    pub fn set_placement_target(&mut self, target: impl PlacementTarget + 'static) {
        self.placement_target = Some(Box::new(target));
    }

    /// Stop sending camera suggestions
    pub fn clear_placement_target(&mut self) {
        self.placement_target = None;
    }

    /// Feed one frame time to the performance controller
    pub fn record_frame(&mut self, delta: DeltaTime) -> Adjustment {
        self.performance.record_frame(delta)
    }

    /// Switch performance mode; loads whose config names no mode keep it
    pub fn set_performance_mode(&mut self, mode: PerformanceMode) {
        self.performance.set_mode(mode);
    }

    /// Performance controller supplying LOD settings to tube loads
    pub fn performance(&self) -> &PerformanceController {
        &self.performance
    }

    /// The model of the last successful load
    pub fn current(&self) -> Option<&LoadedModel> {
        self.current.as_ref()
    }

    /// Surface the model is handed to
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Lights installed before the loader was created
    pub fn lighting(&self) -> &LightingInstalled {
        &self.lighting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vasculo_assets::MemoryFetcher;
    use vasculo_renderer::{LightingRig, VertexAttributes};

    const TREE: &str = "# vtk DataFile Version 3.0\n\
        vessel tree\n\
        ASCII\n\
        DATASET POLYDATA\n\
        POINTS 5 float\n\
        0 0 0\n10 0 0\n20 5 0\n20 15 0\n30 5 2\n\
        LINES 2 7\n\
        3 0 1 2\n\
        2 2 4\n\
        POINT_DATA 5\n\
        SCALARS radius float\n\
        LOOKUP_TABLE default\n\
        2.0 1.8 1.5 1.0 1.2\n\
        SCALARS pressure float\n\
        LOOKUP_TABLE default\n\
        120 110 100 90 95\n";

    fn loader() -> VtkLoader<MemoryFetcher, HeadlessSurface> {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("tree.vtk", TREE);
        let mut surface = HeadlessSurface::new();
        let lighting = install_lighting(&mut surface, &LightingRig::standard(420.0));
        VtkLoader::new(fetcher, surface, lighting)
    }

    #[tokio::test]
    async fn test_load_lines() {
        let mut loader = loader();
        let model = loader
            .load_file("tree.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
            .await
            .unwrap();

        assert_eq!(model.render_mode(), RenderMode::Lines);
        assert!(!model.is_point_cloud());
        assert_eq!(model.stats.segments, 3);
        assert_eq!(model.stats.vertices, 6);
        assert_eq!(model.radius.len(), 5);
        assert_eq!(model.pressure_range.map(|r| (r.min, r.max)), Some((90.0, 120.0)));

        let bounds = model.bounds();
        assert!((bounds.max_dimension() - 420.0).abs() < 1e-2);
        assert!(bounds.center().length() < 1e-2);
        assert_eq!(loader.surface().object_count(), 1);
    }

    #[tokio::test]
    async fn test_load_tubes() {
        let mut loader = loader();
        let config = LoaderConfig {
            use_cylinder_geometry: true,
            ..LoaderConfig::default()
        };
        let model = loader
            .load_file("tree.vtk", &config, &mut LoadCallbacks::new())
            .await
            .unwrap();

        let ModelGeometry::Tubes { batches } = &model.geometry else {
            panic!("expected tubes");
        };
        assert_eq!(batches.batches.len(), 1);
        assert_eq!(batches.batches[0].levels.len(), 4);
        assert_eq!(model.stats.batches, 1);
        assert!(model.stats.primitives > 0);

        // One surface object per batch level
        assert_eq!(loader.surface().object_count(), 4);
        assert!(loader.surface().objects().all(|(_, o)| o.lod.is_some()));
        assert!(
            loader
                .surface()
                .objects()
                .all(|(_, o)| o.attributes == VertexAttributes::all() && !o.transparent)
        );
    }

    #[tokio::test]
    async fn test_points_without_connectivity_fall_back() {
        let mut text = String::from("POINTS 10 float\n");
        for i in 0..10 {
            text.push_str(&format!("{} {} 0\n", i, i * 2));
        }
        let mut loader = loader();
        loader.fetcher().insert("cloud.vtk", text);

        let mut flagged = None;
        let mut callbacks = LoadCallbacks::new().with_complete(|m: &LoadedModel| flagged = Some(m.is_point_cloud()));
        let model = loader
            .load_file("cloud.vtk", &LoaderConfig::default(), &mut callbacks)
            .await
            .unwrap();

        assert!(model.is_point_cloud());
        let ModelGeometry::Points { mesh } = &model.geometry else {
            panic!("expected points");
        };
        assert_eq!(mesh.positions.len(), 10);
        drop(callbacks);
        assert_eq!(flagged, Some(true));
    }

    #[tokio::test]
    async fn test_missing_file_reports_status() {
        let mut loader = loader();
        let err = loader
            .load_file("missing.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(loader.current().is_none());
    }

    #[tokio::test]
    async fn test_empty_file_fails() {
        let mut loader = loader();
        loader.fetcher().insert("empty.vtk", "# vtk DataFile Version 3.0\nnothing\nASCII\n");
        let err = loader
            .load_file("empty.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::Asset(AssetError::NoPoints(_))));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let mut loader = loader();
        let reports = RefCell::new(Vec::new());
        let mut callbacks = LoadCallbacks::new().with_progress(|_: &str, p: f32| reports.borrow_mut().push(p));
        let config = LoaderConfig {
            use_cylinder_geometry: true,
            ..LoaderConfig::default()
        };
        loader.load_file("tree.vtk", &config, &mut callbacks).await.unwrap();
        drop(callbacks);

        let reports = reports.into_inner();
        assert_eq!(reports.first().copied(), Some(0.0));
        assert_eq!(reports.last().copied(), Some(100.0));
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_second_load_replaces_first() {
        let mut loader = loader();
        let config = LoaderConfig {
            use_cylinder_geometry: true,
            ..LoaderConfig::default()
        };
        loader.load_file("tree.vtk", &config, &mut LoadCallbacks::new()).await.unwrap();
        assert_eq!(loader.surface().object_count(), 4);

        let config = LoaderConfig {
            enable_wireframe: true,
            ..LoaderConfig::default()
        };
        let model = loader
            .load_file("tree.vtk", &config, &mut LoadCallbacks::new())
            .await
            .unwrap();
        assert_eq!(model.surface_ids().len(), 2);
        assert_eq!(model.materials.len(), 2);
        assert_eq!(loader.surface().object_count(), 2);
        assert_eq!(loader.surface().light_count(), 4);
    }

    #[tokio::test]
    async fn test_dispose_removes_surface_objects() {
        let mut loader = loader();
        loader
            .load_file("tree.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
            .await
            .unwrap();
        assert_eq!(loader.surface().object_count(), 1);

        loader.dispose();
        assert!(loader.current().is_none());
        assert_eq!(loader.surface().object_count(), 0);
        assert_eq!(loader.surface().light_count(), 4);
        loader.dispose();
    }

    #[tokio::test]
    async fn test_placement_target_receives_camera() {
        let mut loader = loader();
        let received = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&received);
        loader.set_placement_target(move |camera: &CameraPlacement| *sink.borrow_mut() = Some(*camera));

        let config = LoaderConfig {
            model_size: 100.0,
            ..LoaderConfig::default()
        };
        loader.load_file("tree.vtk", &config, &mut LoadCallbacks::new()).await.unwrap();
        assert_eq!(*received.borrow(), Some(CameraPlacement::suggest(100.0)));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_dispose() {
        let mut loader = loader();
        loader
            .load_file("tree.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
            .await
            .unwrap();
        let config = LoaderConfig {
            model_size: -1.0,
            ..LoaderConfig::default()
        };
        let err = loader
            .load_file("tree.vtk", &config, &mut LoadCallbacks::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::InvalidConfig(_)));
        assert!(loader.current().is_some());
    }

    #[tokio::test]
    async fn test_mode_kept_unless_config_names_one() {
        let mut loader = loader();
        loader.set_performance_mode(PerformanceMode::High);
        loader
            .load_file("tree.vtk", &LoaderConfig::default(), &mut LoadCallbacks::new())
            .await
            .unwrap();
        assert_eq!(loader.performance().mode(), PerformanceMode::High);

        let config = LoaderConfig {
            performance_mode: Some(PerformanceMode::Low),
            ..LoaderConfig::default()
        };
        loader
            .load_file("tree.vtk", &config, &mut LoadCallbacks::new())
            .await
            .unwrap();
        assert_eq!(loader.performance().mode(), PerformanceMode::Low);
    }

    #[test]
    fn test_record_frame_adapts_settings() {
        let mut loader = loader();
        let before = loader.performance().settings().clone();
        for _ in 0..30 {
            loader.record_frame(DeltaTime::from_millis(100.0));
        }
        assert_ne!(loader.performance().settings(), &before);

        loader.set_performance_mode(PerformanceMode::High);
        assert_eq!(loader.performance().mode(), PerformanceMode::High);
    }
}
