// tilemesh: polygon clipping, constrained quality triangulation and tile meshing
// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

pub mod bucketalloc;
pub mod clip;
pub mod dict;
pub mod error;
pub mod geom;
pub mod mesh;
pub mod offset;
pub mod pipeline;
pub mod polygon;
pub mod predicates;
pub mod priorityq;
pub mod sweep;
pub mod triangulation;

pub use clip::{ClipOptions, ClipType, Clipper, FillRule};
pub use error::{ClipError, PipelineError, TriangulationError};
pub use geom::{IntPoint, IntRect, Path, Paths};
pub use offset::{EndType, JoinType, Offsetter};
pub use pipeline::{
    CancelToken, DetailLevel, EnginePool, LayerInput, LayerKind, MeshPipeline, MeshRegion,
    PipelineConfig, PlacementRegistry, TileInput, TileMesh,
};
pub use polygon::{Polygon, Segment};
pub use predicates::Point;
pub use sweep::PolyType;
pub use triangulation::{
    CarveRule, ConstraintOptions, QualityOptions, QualityStats, TriangleMesh, Triangulation,
    Triangulator, VertexKind,
};
