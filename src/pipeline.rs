// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Tile mesh pipeline.
//
// For each tile the layers are unioned one group at a time in priority
// order (water, roads, surfaces, background). Every group first loses the
// area already claimed by the groups before it, is clipped to the tile
// rectangle, drops its noise-sized rings and is then triangulated. The
// claimed area only grows, so no two regions of a tile overlap.

mod contours;
mod layers;
mod pool;
mod registry;

use log::{debug, error, warn};
use rayon::prelude::*;

use crate::clip::{ClipType, FillRule};
use crate::error::PipelineError;
use crate::geom::{area, path_to_float, ring_depths, ring_parents, round, IntRect, Path, Paths};
use crate::offset::{EndType, JoinType};
use crate::polygon::Polygon;
use crate::predicates::Point;
use crate::sweep::PolyType;
use crate::triangulation::{CarveRule, ConstraintOptions, QualityOptions, TriangleMesh};

use contours::{closed, split_ring, Grid};
use layers::{add_logged, group_layers, union_group, LayerGroup};

pub use layers::{LayerInput, LayerKind};
pub use pool::{CancelToken, EnginePool, Engines, PooledEngines};
pub use registry::PlacementRegistry;

/// Segment markers handed to the triangulator.
const OUTER_MARKER: u32 = 1;
const HOLE_MARKER: u32 = 2;

/// Refinement leaves edges shorter than this many clipping units alone.
const SPLIT_FLOOR: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum DetailLevel {
    /// Constrained Delaunay, no refinement, no contours.
    /// Segments are still enforced, so a region never spills outside its
    /// clipped boundary.
    #[default]
    Coarse,
    /// Grid-split boundaries, conforming constraints and quality refinement.
    Full,
}

/// Pipeline settings.
///
/// ```
/// use tilemesh::{DetailLevel, PipelineConfig};
/// let config = PipelineConfig::default()
///     .with_detail(DetailLevel::Full)
///     .with_grid_spacing(8.0);
/// assert_eq!(config.min_region_area, 0.001);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Float to fixed-point factor used for clipping.
    pub scale: f64,
    /// Rings with a smaller absolute area (in input units) are dropped.
    pub min_region_area: f64,
    pub detail: DetailLevel,
    pub grid_spacing: f64,
    pub quality: QualityOptions,
    pub constraints: ConstraintOptions,
    pub road_join: JoinType,
    /// End cap for open road centre lines.
    pub road_end: EndType,
    /// Key of the background region when a tile supplies none.
    pub background_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            scale: 1000.0,
            min_region_area: 0.001,
            detail: DetailLevel::Coarse,
            grid_spacing: 10.0,
            quality: QualityOptions::default(),
            constraints: ConstraintOptions::default(),
            road_join: JoinType::Round,
            road_end: EndType::OpenRound,
            background_key: "background".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_min_region_area(mut self, area: f64) -> Self {
        self.min_region_area = area;
        self
    }

    pub fn with_detail(mut self, detail: DetailLevel) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_grid_spacing(mut self, spacing: f64) -> Self {
        self.grid_spacing = spacing;
        self
    }

    pub fn with_quality(mut self, quality: QualityOptions) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintOptions) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_road_join(mut self, join: JoinType) -> Self {
        self.road_join = join;
        self
    }

    pub fn with_road_end(mut self, end: EndType) -> Self {
        self.road_end = end;
        self
    }

    pub fn with_background_key(mut self, key: impl Into<String>) -> Self {
        self.background_key = key.into();
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let bad = |msg: String| Err(PipelineError::Config(msg));
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return bad(format!("scale must be positive, got {}", self.scale));
        }
        if !(self.min_region_area.is_finite() && self.min_region_area >= 0.0) {
            return bad(format!(
                "minimum region area must be non-negative, got {}",
                self.min_region_area
            ));
        }
        if !(self.grid_spacing.is_finite() && self.grid_spacing > 0.0) {
            return bad(format!("grid spacing must be positive, got {}", self.grid_spacing));
        }
        let q = &self.quality;
        if !(0.0..60.0).contains(&q.min_angle) {
            return bad(format!("minimum angle must be in [0, 60), got {}", q.min_angle));
        }
        if !(q.max_angle > 60.0 && q.max_angle <= 180.0) {
            return bad(format!("maximum angle must be in (60, 180], got {}", q.max_angle));
        }
        if let Some(a) = q.max_area {
            if !(a.is_finite() && a > 0.0) {
                return bad(format!("maximum triangle area must be positive, got {}", a));
            }
        }
        Ok(())
    }
}

/// Everything the pipeline needs for one tile.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct TileInput {
    pub id: u64,
    /// `[min_x, min_y, max_x, max_y]` in the tile's planar frame.
    pub rect: [f64; 4],
    pub layers: Vec<LayerInput>,
    /// Model placements the tile would like to own.
    pub placements: Vec<u64>,
}

impl TileInput {
    pub fn new(id: u64, rect: [f64; 4]) -> Self {
        TileInput {
            id,
            rect,
            layers: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: LayerInput) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_placements(mut self, ids: &[u64]) -> Self {
        self.placements.extend_from_slice(ids);
        self
    }
}

/// A triangulated region of one layer group.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshRegion {
    pub kind: LayerKind,
    pub key: String,
    pub mesh: TriangleMesh,
    /// Closed boundary rings split on the grid; empty at coarse detail.
    pub contours: Vec<Vec<[f64; 2]>>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMesh {
    pub id: u64,
    pub regions: Vec<MeshRegion>,
    /// Placements this tile won in the registry.
    pub placements: Vec<u64>,
}

impl TileMesh {
    pub fn region(&self, kind: LayerKind, key: &str) -> Option<&MeshRegion> {
        self.regions.iter().find(|r| r.kind == kind && r.key == key)
    }

    pub fn total_area(&self) -> f64 {
        self.regions.iter().map(|r| r.mesh.area()).sum()
    }
}

/// Builds tile meshes, in parallel when given several tiles.
///
/// ```
/// use tilemesh::{CancelToken, LayerInput, LayerKind, MeshPipeline, PipelineConfig, TileInput};
///
/// let pipeline = MeshPipeline::new(PipelineConfig::default()).unwrap();
/// let tile = TileInput::new(0, [0.0, 0.0, 10.0, 10.0]).with_layer(
///     LayerInput::new(LayerKind::Water, "lake")
///         .with_path(vec![[2.0, 2.0], [6.0, 2.0], [6.0, 6.0], [2.0, 6.0]]),
/// );
/// let mesh = pipeline.build_tile(&tile, &CancelToken::new()).unwrap();
/// assert_eq!(mesh.regions.len(), 2);
/// assert!((mesh.total_area() - 100.0).abs() < 1e-6);
/// ```
pub struct MeshPipeline {
    config: PipelineConfig,
    pool: EnginePool,
    registry: PlacementRegistry,
}

impl MeshPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(MeshPipeline {
            config,
            pool: EnginePool::new(),
            registry: PlacementRegistry::new(),
        })
    }

    /// Share an existing registry, e.g. with another pipeline.
    pub fn with_registry(mut self, registry: PlacementRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlacementRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &EnginePool {
        &self.pool
    }

    /// Drop a deactivated tile's placement claims.
    pub fn release_tile(&self, id: u64) -> usize {
        self.registry.release_tile(id)
    }

    /// Build every tile on the rayon pool. Results keep the input order.
    pub fn build_tiles(
        &self,
        tiles: &[TileInput],
        cancel: &CancelToken,
    ) -> Vec<Result<TileMesh, PipelineError>> {
        tiles
            .par_iter()
            .map(|tile| self.build_tile(tile, cancel))
            .collect()
    }

    pub fn build_tile(&self, tile: &TileInput, cancel: &CancelToken) -> Result<TileMesh, PipelineError> {
        let rect = self.tile_rect(tile)?;
        let mut engines = self.pool.checkout();
        match self.build_regions(&mut engines, tile, rect, cancel) {
            Ok(regions) => {
                let placements = self.registry.claim(tile.id, &tile.placements);
                debug!(
                    "tile {}: {} regions, {} triangles, {} placements",
                    tile.id,
                    regions.len(),
                    regions.iter().map(|r| r.mesh.triangles.len()).sum::<usize>(),
                    placements.len()
                );
                Ok(TileMesh {
                    id: tile.id,
                    regions,
                    placements,
                })
            }
            Err(PipelineError::Cancelled(id)) => {
                debug!("tile {} cancelled", id);
                Err(PipelineError::Cancelled(id))
            }
            Err(e) => {
                error!("tile {} aborted: {}", tile.id, e);
                Err(e)
            }
        }
    }

    fn tile_rect(&self, tile: &TileInput) -> Result<IntRect, PipelineError> {
        let [x0, y0, x1, y1] = tile.rect;
        if !tile.rect.iter().all(|c| c.is_finite()) || x0 >= x1 || y0 >= y1 {
            return Err(PipelineError::Config(format!(
                "tile {} has an empty rectangle {:?}",
                tile.id, tile.rect
            )));
        }
        let s = self.config.scale;
        Ok(IntRect {
            left: round(x0 * s),
            top: round(y0 * s),
            right: round(x1 * s),
            bottom: round(y1 * s),
        })
    }

    fn build_regions(
        &self,
        engines: &mut Engines,
        tile: &TileInput,
        rect: IntRect,
        cancel: &CancelToken,
    ) -> Result<Vec<MeshRegion>, PipelineError> {
        let rect_path = rect.to_path();
        let grid = Grid {
            origin: [tile.rect[0], tile.rect[1]],
            spacing: self.config.grid_spacing,
        };
        let mut groups = group_layers(&tile.layers);
        if !groups.iter().any(|g| g.kind == LayerKind::Background) {
            groups.push(LayerGroup {
                kind: LayerKind::Background,
                key: &self.config.background_key,
                inputs: Vec::new(),
            });
        }

        let mut taken: Paths = Vec::new();
        let mut regions = Vec::new();
        for group in &groups {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled(tile.id));
            }
            match self.build_region(engines, group, &rect_path, &mut taken, &grid) {
                Ok(Some(region)) => regions.push(region),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(
                    "tile {}: {:?} '{}' skipped: {}",
                    tile.id, group.kind, group.key, e
                ),
            }
        }
        Ok(regions)
    }

    /// Clip one group against what earlier groups claimed and the tile,
    /// then triangulate what is left.
    fn build_region(
        &self,
        engines: &mut Engines,
        group: &LayerGroup<'_>,
        rect_path: &Path,
        taken: &mut Paths,
        grid: &Grid,
    ) -> Result<Option<MeshRegion>, PipelineError> {
        let subject = if group.kind == LayerKind::Background && !group.has_paths() {
            vec![rect_path.clone()]
        } else {
            union_group(engines, group, &self.config)?
        };
        if subject.is_empty() {
            return Ok(None);
        }

        let what = format!("{:?} '{}'", group.kind, group.key);
        let clipper = &mut engines.clipper;
        clipper.clear();
        add_logged(clipper, &subject, PolyType::Subject, &what)?;
        add_logged(clipper, taken.as_slice(), PolyType::Clip, "claimed area")?;
        let free = clipper.execute(ClipType::Difference, FillRule::NonZero, FillRule::NonZero)?;
        clipper.clear();
        add_logged(clipper, &free, PolyType::Subject, &what)?;
        clipper.add_path(rect_path, PolyType::Clip, true)?;
        let region = clipper.execute(ClipType::Intersection, FillRule::NonZero, FillRule::NonZero)?;
        clipper.clear();

        let s = self.config.scale;
        let total = region.len();
        let kept = significant_rings(region, self.config.min_region_area * s * s);
        if kept.len() < total {
            debug!("{}: {} rings below the area threshold dropped", what, total - kept.len());
        }
        // Dropped slivers stay free for the groups that follow.
        taken.extend(kept.iter().map(|(ring, _)| ring.clone()));

        // All rings of the region go into one polygon; parity decides what
        // is inside, so touching or slightly misplaced holes still carve.
        let full = self.config.detail == DetailLevel::Full;
        let mut polygon = Polygon::new();
        let mut contours = Vec::new();
        for (ring, depth) in &kept {
            let mut pts = path_to_float(ring, s);
            if full {
                pts = split_ring(&pts, grid);
            }
            let points: Vec<Point> = pts.iter().map(|&p| Point::from(p)).collect();
            let marker = if depth % 2 == 1 { HOLE_MARKER } else { OUTER_MARKER };
            if polygon.add_contour(&points, false, marker) && full {
                contours.push(closed(&pts));
            }
        }
        if polygon.segments.is_empty() {
            return Ok(None);
        }
        let mesh = self.triangulate(engines, &polygon)?;
        if mesh.is_empty() {
            return Ok(None);
        }
        Ok(Some(MeshRegion {
            kind: group.kind,
            key: group.key.to_string(),
            mesh,
            contours,
        }))
    }

    fn triangulate(&self, engines: &mut Engines, polygon: &Polygon) -> Result<TriangleMesh, PipelineError> {
        let tri = &mut engines.triangulator;
        let constraints = self.config.constraints.with_carve_rule(CarveRule::EvenOdd);
        let built = match self.config.detail {
            DetailLevel::Coarse => {
                let constraints = constraints.with_conforming_delaunay(false);
                tri.triangulate_polygon(polygon, &constraints, None)?
            }
            DetailLevel::Full => {
                let constraints = constraints.with_conforming_delaunay(true);
                let floor = SPLIT_FLOOR / self.config.scale;
                let mut quality = self.config.quality;
                quality.min_edge = Some(quality.min_edge.map_or(floor, |m| m.max(floor)));
                tri.triangulate_polygon(polygon, &constraints, Some(&quality))?
            }
        };
        let mesh = built.to_mesh();
        tri.recycle(built);
        Ok(mesh)
    }
}

/// Rings worth meshing, with their nesting depth. A ring smaller than
/// `min_area` goes together with everything nested in it. A dropped hole is
/// thereby filled by its outer, which is also what the caller claims.
fn significant_rings(rings: Paths, min_area: f64) -> Vec<(Path, usize)> {
    let parents = ring_parents(&rings);
    let depths = ring_depths(&parents);
    let tiny = |i: usize| area(&rings[i]).abs() < min_area;
    let dropped: Vec<bool> = (0..rings.len())
        .map(|i| {
            let mut cur = Some(i);
            while let Some(j) = cur {
                if tiny(j) {
                    return true;
                }
                cur = parents[j];
            }
            false
        })
        .collect();
    rings
        .into_iter()
        .zip(depths)
        .zip(dropped)
        .filter(|(_, gone)| !gone)
        .map(|(kept, _)| kept)
        .collect()
}
