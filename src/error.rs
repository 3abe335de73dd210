// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use thiserror::Error;

/// Errors reported by the clipping and offsetting engines.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ClipError {
    #[error("path has {0} usable vertices after cleanup, at least 3 are required")]
    TooFewVertices(usize),
    #[error("path has no area: every vertex lies on one horizontal line")]
    ZeroArea,
    #[error("open paths are not supported")]
    OpenPathUnsupported,
    #[error("coordinate ({x}, {y}) is outside the accepted fixed-point range")]
    CoordinateOutOfRange { x: i64, y: i64 },
    /// An invariant of the sweep was broken. The result cannot be trusted.
    #[error("clipping invariant violated: {0}")]
    Internal(String),
}

impl ClipError {
    pub fn is_internal(&self) -> bool {
        matches!(self, ClipError::Internal(_))
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum TriangulationError {
    #[error("at least 3 distinct, non-collinear points are required (got {0})")]
    TooFewPoints(usize),
    #[error("segment references vertex {0}, which is not part of the mesh")]
    UnknownVertex(u32),
    #[error("polygon has {polygon} points but the mesh was built from {mesh}")]
    PointCountMismatch { polygon: usize, mesh: usize },
    #[error("segment {a}-{b} crosses an existing constrained segment")]
    CrossingSegments { a: u32, b: u32 },
    #[error("point ({x}, {y}) is not finite")]
    NonFinite { x: f64, y: f64 },
    /// Mesh topology is corrupt (for example a non-reciprocal neighbour link).
    #[error("triangulation invariant violated: {0}")]
    Internal(String),
}

impl TriangulationError {
    pub fn is_internal(&self) -> bool {
        matches!(self, TriangulationError::Internal(_))
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Clip(#[from] ClipError),
    #[error(transparent)]
    Triangulation(#[from] TriangulationError),
    #[error("tile {0} was cancelled")]
    Cancelled(u64),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Fatal errors abort the whole tile; the rest only cost one region.
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::Clip(e) => e.is_internal(),
            PipelineError::Triangulation(e) => e.is_internal(),
            PipelineError::Cancelled(_) | PipelineError::Config(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_follows_the_taxonomy() {
        let skip: PipelineError = ClipError::TooFewVertices(2).into();
        assert!(!skip.is_fatal());
        let skip: PipelineError = TriangulationError::TooFewPoints(1).into();
        assert!(!skip.is_fatal());
        let fatal: PipelineError = ClipError::Internal("DoMaxima".into()).into();
        assert!(fatal.is_fatal());
        let fatal: PipelineError =
            TriangulationError::Internal("neighbour link not reciprocal".into()).into();
        assert!(fatal.is_fatal());
        assert!(PipelineError::Cancelled(3).is_fatal());
    }

    #[test]
    fn messages_carry_context() {
        let e = ClipError::CoordinateOutOfRange { x: 1, y: 2 };
        assert_eq!(
            e.to_string(),
            "coordinate (1, 2) is outside the accepted fixed-point range"
        );
    }
}
