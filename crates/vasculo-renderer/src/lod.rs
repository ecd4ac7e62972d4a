//! Level-of-detail batching
//!
//! Segments are partitioned into fixed-size batches. Every batch carries one
//! merged tube mesh per LOD variant, coarser variants activating at larger
//! camera distances. Building yields back to the caller's frame loop every few
//! batches so a large tree never blocks rendering for long.

use std::future::Future;
use std::ops::Range;

use glam::Vec3;
use smallvec::{smallvec, SmallVec};
use vasculo_assets::ProgressSink;
use vasculo_core::{Aabb, BoundingSphere};

use crate::geometry::Segment;
use crate::mesh::MeshLod;
use crate::tube::{tube_mesh, TubeStyle, MAX_RADIAL_SEGMENTS, MIN_RADIAL_SEGMENTS};
use crate::{RendererError, RendererResult};

/// Segments per batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Batches built between two frame yields
pub const DEFAULT_YIELD_EVERY: usize = 2;

/// Detail parameters of one LOD level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodVariant {
    /// Radial vertices per tube ring
    pub segments: usize,
    /// Multiplier on segment radii
    pub radius_scale: f32,
    /// Camera distance up to which this level is active
    pub distance: f32,
}

impl LodVariant {
    /// Level with `segments` radial vertices, active up to `distance`
    pub const fn new(segments: usize, radius_scale: f32, distance: f32) -> Self {
        Self {
            segments,
            radius_scale,
            distance,
        }
    }

    /// Tube style for this level
    pub fn style(&self, capped: bool) -> TubeStyle {
        TubeStyle {
            radial_segments: self.segments,
            radius_scale: self.radius_scale,
            capped,
        }
    }
}

/// Ordered LOD variants plus batching parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LodSettings {
    /// Variants from nearest to farthest
    pub variants: SmallVec<[LodVariant; 4]>,
    /// Segments per batch
    pub batch_size: usize,
    /// Close tubes with end caps
    pub capped: bool,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            variants: smallvec![
                LodVariant::new(8, 1.0, 200.0),
                LodVariant::new(6, 0.9, 500.0),
                LodVariant::new(4, 0.8, 1000.0),
                LodVariant::new(3, 0.7, f32::INFINITY),
            ],
            batch_size: DEFAULT_BATCH_SIZE,
            capped: true,
        }
    }
}

impl LodSettings {
    /// Settings from an explicit variant list
    pub fn new(variants: impl IntoIterator<Item = LodVariant>, batch_size: usize) -> Self {
        Self {
            variants: variants.into_iter().collect(),
            batch_size,
            capped: true,
        }
    }

    /// Nearest (most detailed) variant
    pub fn near(&self) -> Option<&LodVariant> {
        self.variants.first()
    }

    /// Scale the variant list so the nearest level uses `segments` radial
    /// vertices and `radius_scale`; farther levels keep their relative detail.
    pub fn rebased(&self, segments: usize, radius_scale: f32) -> Self {
        let Some(near) = self.near().copied() else {
            return self.clone();
        };

        let segment_factor = segments.max(MIN_RADIAL_SEGMENTS) as f32 / near.segments.max(1) as f32;
        let radius_factor = if near.radius_scale > 0.0 {
            radius_scale / near.radius_scale
        } else {
            radius_scale
        };

        let variants = self
            .variants
            .iter()
            .map(|v| LodVariant {
                segments: (v.segments as f32 * segment_factor).round() as usize,
                radius_scale: v.radius_scale * radius_factor,
                distance: v.distance,
            })
            .collect();

        Self {
            variants,
            ..self.clone()
        }
        .normalized()
    }

    /// Enforce ordering and monotonicity.
    ///
    /// Variants are sorted by distance; segment counts and radius scales are
    /// then made non-increasing and kept within the ring limits. An empty
    /// list falls back to the defaults.
    pub fn normalized(&self) -> Self {
        if self.variants.is_empty() {
            return Self {
                batch_size: self.batch_size.max(1),
                capped: self.capped,
                ..Self::default()
            };
        }

        let mut variants = self.variants.clone();
        variants.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut max_segments = MAX_RADIAL_SEGMENTS;
        let mut max_radius = f32::INFINITY;
        for variant in variants.iter_mut() {
            variant.segments = variant.segments.max(MIN_RADIAL_SEGMENTS).min(max_segments);
            if !variant.radius_scale.is_finite() || variant.radius_scale <= 0.0 {
                variant.radius_scale = max_radius.min(1.0);
            }
            variant.radius_scale = variant.radius_scale.min(max_radius);
            max_segments = variant.segments;
            max_radius = variant.radius_scale;
        }

        Self {
            variants,
            batch_size: self.batch_size.max(1),
            capped: self.capped,
        }
    }

    /// Whether distances increase while detail never increases
    pub fn is_monotonic(&self) -> bool {
        self.variants.windows(2).all(|pair| {
            pair[0].distance < pair[1].distance
                && pair[0].segments >= pair[1].segments
                && pair[0].radius_scale >= pair[1].radius_scale
        })
    }

    /// Reject settings the batcher cannot build
    pub fn validate(&self) -> RendererResult<()> {
        if self.variants.is_empty() {
            return Err(RendererError::InvalidLod("no variants".into()));
        }
        if self.batch_size == 0 {
            return Err(RendererError::InvalidLod("batch size must be positive".into()));
        }
        if !self.is_monotonic() {
            return Err(RendererError::InvalidLod(format!(
                "variants are not monotonic: {:?}",
                self.variants
            )));
        }
        Ok(())
    }
}

/// One spatial batch of segments with its LOD meshes
#[derive(Debug, Clone)]
pub struct Batch {
    /// Batch position in build order
    pub index: usize,
    /// Covered range of the input segment list
    pub segment_range: Range<usize>,
    /// Bounds of the most detailed mesh
    pub bounds: Aabb,
    /// Sphere around `bounds`, used for distance selection
    pub sphere: BoundingSphere,
    /// Levels ordered from nearest to farthest
    pub levels: Vec<MeshLod>,
}

impl Batch {
    /// Level for a camera distance: the first whose activation distance
    /// covers it, or the farthest level.
    pub fn select(&self, distance: f32) -> Option<&MeshLod> {
        self.levels
            .iter()
            .find(|level| level.distance() >= distance)
            .or_else(|| self.levels.last())
    }

    /// Level for a viewer position
    pub fn select_for_viewer(&self, viewer: Vec3) -> Option<&MeshLod> {
        self.select(self.sphere.distance_to(viewer))
    }

    /// Number of segments in the batch
    pub fn segment_count(&self) -> usize {
        self.segment_range.len()
    }
}

/// Totals over a batch build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub batches: usize,
    pub segments: usize,
    /// Vertices summed over every level
    pub vertices: usize,
    /// Triangles summed over every level
    pub triangles: usize,
    /// Frame yields performed
    pub yields: usize,
}

/// Output of the batch builder
#[derive(Debug, Clone, Default)]
pub struct BatchedModel {
    pub batches: Vec<Batch>,
    pub stats: BuildStats,
}

impl BatchedModel {
    /// Union of every batch's bounds
    pub fn bounds(&self) -> Aabb {
        self.batches
            .iter()
            .fold(Aabb::EMPTY, |acc, batch| acc.merge(&batch.bounds))
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Hands control back to the frame loop between batches
pub trait FrameYield {
    /// Suspend until the next frame
    fn yield_frame(&mut self) -> impl Future<Output = ()>;
}

/// Yields to the tokio scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioYield;

impl FrameYield for TokioYield {
    fn yield_frame(&mut self) -> impl Future<Output = ()> {
        tokio::task::yield_now()
    }
}

/// Never suspends; for synchronous callers and benchmarks
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl FrameYield for NoYield {
    fn yield_frame(&mut self) -> impl Future<Output = ()> {
        std::future::ready(())
    }
}

/// Builds batched LOD tube meshes
#[derive(Debug, Clone)]
pub struct LodBatcher {
    settings: LodSettings,
    yield_every: usize,
}

impl LodBatcher {
    /// Batcher for normalized `settings`
    pub fn new(settings: &LodSettings) -> Self {
        Self {
            settings: settings.normalized(),
            yield_every: DEFAULT_YIELD_EVERY,
        }
    }

    /// Change the number of batches built between yields (at least one)
    pub fn with_yield_every(mut self, batches: usize) -> Self {
        self.yield_every = batches.max(1);
        self
    }

    /// Normalized settings the batcher builds with
    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    /// Number of batches `segment_count` segments split into
    pub fn batch_count(&self, segment_count: usize) -> usize {
        segment_count.div_ceil(self.settings.batch_size)
    }

    /// Build every level for one batch
    pub fn build_batch(&self, index: usize, segment_range: Range<usize>, segments: &[Segment]) -> Batch {
        let span = tracing::debug_span!("lod_batch", index, segments = segments.len());
        let _enter = span.enter();

        let levels: Vec<MeshLod> = self
            .settings
            .variants
            .iter()
            .enumerate()
            .map(|(level, variant)| MeshLod {
                level: level as u32,
                variant: *variant,
                mesh: tube_mesh(
                    format!("vessel_batch_{index}_lod{level}"),
                    segments,
                    &variant.style(self.settings.capped),
                ),
            })
            .collect();

        let bounds = levels
            .first()
            .map(|level| level.mesh.bounds())
            .unwrap_or(Aabb::EMPTY);

        tracing::trace!(
            vertices = levels.iter().map(|l| l.mesh.vertex_count()).sum::<usize>(),
            "batch built"
        );

        Batch {
            index,
            segment_range,
            bounds,
            sphere: BoundingSphere::from_aabb(&bounds),
            levels,
        }
    }

    /// Partition `segments` into batches and build their LOD meshes.
    ///
    /// Batches are built strictly in order. After every `yield_every` batches
    /// the builder awaits `yielder`. Progress is reported in percent of batches
    /// built.
    pub async fn build<Y, P>(&self, segments: &[Segment], yielder: &mut Y, progress: &mut P) -> BatchedModel
    where
        Y: FrameYield,
        P: ProgressSink,
    {
        let batch_size = self.settings.batch_size;
        let total = self.batch_count(segments.len());
        let mut model = BatchedModel {
            batches: Vec::with_capacity(total),
            stats: BuildStats {
                segments: segments.len(),
                ..BuildStats::default()
            },
        };

        for (index, chunk) in segments.chunks(batch_size).enumerate() {
            let start = index * batch_size;
            let batch = self.build_batch(index, start..start + chunk.len(), chunk);

            for level in &batch.levels {
                model.stats.vertices += level.mesh.vertex_count();
                model.stats.triangles += level.mesh.triangle_count();
            }
            model.batches.push(batch);
            model.stats.batches += 1;

            progress.report(
                "Building tube geometry",
                model.stats.batches as f32 / total as f32 * 100.0,
            );

            if model.stats.batches % self.yield_every == 0 && model.stats.batches < total {
                yielder.yield_frame().await;
                model.stats.yields += 1;
            }
        }

        log::debug!(
            "Built {} batches ({} vertices, {} triangles, {} yields)",
            model.stats.batches,
            model.stats.vertices,
            model.stats.triangles,
            model.stats.yields
        );

        model
    }
}

impl Default for LodBatcher {
    fn default() -> Self {
        Self::new(&LodSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(count: usize) -> Vec<Segment> {
        (0..count)
            .map(|i| {
                let x = i as f32;
                Segment {
                    start: Vec3::new(x, 0.0, 0.0),
                    end: Vec3::new(x + 1.0, 0.5, 0.0),
                    start_radius: 0.2,
                    end_radius: 0.1,
                    start_color: [1.0, 0.0, 0.0],
                    end_color: [0.0, 0.0, 1.0],
                }
            })
            .collect()
    }

    #[derive(Default)]
    struct CountingYield {
        count: usize,
    }

    impl FrameYield for CountingYield {
        fn yield_frame(&mut self) -> impl Future<Output = ()> {
            self.count += 1;
            std::future::ready(())
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = LodSettings::default();
        assert_eq!(settings.variants.len(), 4);
        assert_eq!(settings.batch_size, 1000);
        assert!(settings.is_monotonic());
        assert!(settings.validate().is_ok());
        assert_eq!(settings.variants[3].distance, f32::INFINITY);
    }

    #[test]
    fn test_normalized_restores_monotonicity() {
        let settings = LodSettings::new(
            [
                LodVariant::new(4, 0.8, 1000.0),
                LodVariant::new(2, 1.0, 200.0),
                LodVariant::new(12, 0.9, 500.0),
            ],
            0,
        );
        assert!(!settings.is_monotonic());

        let normalized = settings.normalized();
        assert!(normalized.is_monotonic());
        assert_eq!(normalized.batch_size, 1);
        assert_eq!(normalized.variants[0].segments, MIN_RADIAL_SEGMENTS);
        assert!(normalized.variants.iter().all(|v| v.segments == MIN_RADIAL_SEGMENTS));
    }

    #[test]
    fn test_rebased_caps_segments() {
        let settings = LodSettings::default().rebased(4_000_000_000, 1.0);
        assert_eq!(settings.variants[0].segments, MAX_RADIAL_SEGMENTS);
        assert!(settings.variants.iter().all(|v| v.segments <= MAX_RADIAL_SEGMENTS));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_variants_fall_back_to_defaults() {
        let settings = LodSettings::new([], 250);
        assert!(settings.validate().is_err());
        let normalized = settings.normalized();
        assert_eq!(normalized.variants, LodSettings::default().variants);
        assert_eq!(normalized.batch_size, 250);
    }

    #[test]
    fn test_rebased_sets_near_tier() {
        let settings = LodSettings::default().rebased(16, 1.2);
        assert_eq!(settings.variants[0].segments, 16);
        assert!((settings.variants[0].radius_scale - 1.2).abs() < 1e-6);
        assert_eq!(settings.variants[1].segments, 12);
        assert_eq!(settings.variants[3].segments, 6);
        assert!(settings.is_monotonic());

        let coarse = LodSettings::default().rebased(3, 1.0);
        assert!(coarse.variants.iter().all(|v| v.segments == MIN_RADIAL_SEGMENTS));
        assert!(coarse.is_monotonic());
    }

    #[test]
    fn test_select_by_distance() {
        let batcher = LodBatcher::default();
        let batch = batcher.build_batch(0, 0..4, &segments(4));

        assert_eq!(batch.levels.len(), 4);
        assert_eq!(batch.select(0.0).map(|l| l.level), Some(0));
        assert_eq!(batch.select(200.0).map(|l| l.level), Some(0));
        assert_eq!(batch.select(350.0).map(|l| l.level), Some(1));
        assert_eq!(batch.select(999.0).map(|l| l.level), Some(2));
        assert_eq!(batch.select(1e9).map(|l| l.level), Some(3));
    }

    #[test]
    fn test_select_falls_back_to_farthest() {
        let settings = LodSettings::new(
            [LodVariant::new(8, 1.0, 10.0), LodVariant::new(4, 0.8, 20.0)],
            10,
        );
        let batch = LodBatcher::new(&settings).build_batch(0, 0..1, &segments(1));
        assert_eq!(batch.select(500.0).map(|l| l.level), Some(1));
    }

    #[test]
    fn test_levels_lose_detail_with_distance() {
        let batch = LodBatcher::default().build_batch(0, 0..8, &segments(8));
        let counts: Vec<usize> = batch.levels.iter().map(|l| l.mesh.vertex_count()).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        assert!(batch.levels.iter().all(|l| l.mesh.validate().is_ok()));
        assert!(!batch.bounds.is_empty());
    }

    #[tokio::test]
    async fn test_build_partitions_segments() {
        let settings = LodSettings {
            batch_size: 10,
            ..LodSettings::default()
        };
        let batcher = LodBatcher::new(&settings);
        let input = segments(35);

        let model = batcher
            .build(&input, &mut NoYield, &mut vasculo_assets::no_progress)
            .await;

        assert_eq!(model.batches.len(), 4);
        assert_eq!(model.stats.batches, 4);
        assert_eq!(model.stats.segments, 35);
        assert_eq!(model.batches[3].segment_range, 30..35);
        assert_eq!(model.batches[3].segment_count(), 5);
        assert!(model.batches.iter().enumerate().all(|(i, b)| b.index == i));
        assert!(model.stats.triangles > 0);
    }

    #[tokio::test]
    async fn test_yield_cadence() {
        let settings = LodSettings {
            batch_size: 1,
            ..LodSettings::default()
        };
        let input = segments(7);
        let mut yielder = CountingYield::default();

        let model = LodBatcher::new(&settings)
            .build(&input, &mut yielder, &mut vasculo_assets::no_progress)
            .await;

        // Yields after batches 2, 4 and 6; none after the final batch
        assert_eq!(yielder.count, 3);
        assert_eq!(model.stats.yields, 3);

        let mut yielder = CountingYield::default();
        LodBatcher::new(&settings)
            .with_yield_every(1)
            .build(&input, &mut yielder, &mut vasculo_assets::no_progress)
            .await;
        assert_eq!(yielder.count, 6);
    }

    #[tokio::test]
    async fn test_build_reports_progress() {
        let settings = LodSettings {
            batch_size: 2,
            ..LodSettings::default()
        };
        let mut reports = Vec::new();
        LodBatcher::new(&settings)
            .build(&segments(6), &mut TokioYield, &mut |_: &str, p: f32| reports.push(p))
            .await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports.last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn test_build_empty() {
        let model = LodBatcher::default()
            .build(&[], &mut NoYield, &mut vasculo_assets::no_progress)
            .await;
        assert!(model.is_empty());
        assert!(model.bounds().is_empty());
    }
}
