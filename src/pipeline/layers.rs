// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Semantic layers: priority order, grouping by key, and the per-layer union
// (with road centre lines widened by the offsetter first).

use log::warn;

use super::pool::Engines;
use super::PipelineConfig;
use crate::clip::{ClipType, Clipper, FillRule};
use crate::error::ClipError;
use crate::geom::{IntPoint, Path, Paths};
use crate::offset::EndType;
use crate::sweep::PolyType;

/// Semantic layer, declared in priority order: an earlier kind is never
/// covered by a later one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum LayerKind {
    Water,
    CarRoad,
    WalkRoad,
    Surface,
    Background,
}

/// One batch of input for a layer.
///
/// ```
/// use tilemesh::{LayerInput, LayerKind};
/// let road = LayerInput::new(LayerKind::CarRoad, "asphalt")
///     .with_path(vec![[0.0, 5.0], [20.0, 5.0]])
///     .with_width(4.0);
/// assert_eq!(road.width, Some(4.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerInput {
    pub kind: LayerKind,
    /// Gradient or material key; surfaces with different keys stay apart.
    pub key: String,
    /// Closed rings, or centre lines when `width` is set.
    pub paths: Vec<Vec<[f64; 2]>>,
    pub width: Option<f64>,
}

impl LayerInput {
    pub fn new(kind: LayerKind, key: impl Into<String>) -> Self {
        LayerInput {
            kind,
            key: key.into(),
            paths: Vec::new(),
            width: None,
        }
    }

    pub fn with_path(mut self, path: Vec<[f64; 2]>) -> Self {
        self.paths.push(path);
        self
    }

    pub fn with_paths(mut self, paths: Vec<Vec<[f64; 2]>>) -> Self {
        self.paths.extend(paths);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

/// Inputs sharing a kind and key, processed as one region.
#[derive(Debug)]
pub(crate) struct LayerGroup<'a> {
    pub kind: LayerKind,
    pub key: &'a str,
    pub inputs: Vec<&'a LayerInput>,
}

impl LayerGroup<'_> {
    pub fn has_paths(&self) -> bool {
        self.inputs.iter().any(|i| !i.paths.is_empty())
    }
}

/// Group inputs by (kind, key), ordered by kind priority and then by the
/// first appearance of each key.
pub(crate) fn group_layers(layers: &[LayerInput]) -> Vec<LayerGroup<'_>> {
    let mut groups: Vec<LayerGroup<'_>> = Vec::new();
    for layer in layers {
        match groups
            .iter_mut()
            .find(|g| g.kind == layer.kind && g.key == layer.key)
        {
            Some(g) => g.inputs.push(layer),
            None => groups.push(LayerGroup {
                kind: layer.kind,
                key: &layer.key,
                inputs: vec![layer],
            }),
        }
    }
    // Stable, so keys keep their order within a kind.
    groups.sort_by_key(|g| g.kind);
    groups
}

fn to_fixed(path: &[[f64; 2]], scale: f64) -> Option<Path> {
    if path.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return None;
    }
    Some(
        path.iter()
            .map(|p| IntPoint::from_float(p[0], p[1], scale))
            .collect(),
    )
}

/// Add paths to the clipper, logging the ones it turns down.
pub(crate) fn add_logged(
    clipper: &mut Clipper,
    paths: &[Path],
    role: PolyType,
    what: &str,
) -> Result<(), ClipError> {
    for (i, e) in clipper.add_paths(paths, role, true)? {
        warn!("{}: path {} skipped: {}", what, i, e);
    }
    Ok(())
}

/// Union of every path in the group, in fixed point. Widened inputs are
/// offset into outlines first.
pub(crate) fn union_group(
    engines: &mut Engines,
    group: &LayerGroup<'_>,
    config: &PipelineConfig,
) -> Result<Paths, ClipError> {
    let scale = config.scale;
    let mut rings: Paths = Vec::new();
    for input in &group.inputs {
        let mut fixed: Paths = Vec::with_capacity(input.paths.len());
        for (i, path) in input.paths.iter().enumerate() {
            match to_fixed(path, scale) {
                Some(p) => fixed.push(p),
                None => warn!("{:?} '{}': path {} has a non-finite point", group.kind, group.key, i),
            }
        }
        match input.width {
            None => rings.append(&mut fixed),
            Some(w) if w > 0.0 && w.is_finite() => {
                let off = &mut engines.offsetter;
                off.clear();
                let delta = 0.5 * w * scale;
                for line in &fixed {
                    let closed = line.len() > 2 && line.first() == line.last();
                    let end = if closed { EndType::ClosedLine } else { config.road_end };
                    off.add_path(line, delta, config.road_join, end);
                }
                let mut outlines = off.execute()?;
                off.clear();
                rings.append(&mut outlines);
            }
            Some(w) => warn!(
                "{:?} '{}': width {} is not positive, input skipped",
                group.kind, group.key, w
            ),
        }
    }
    if rings.is_empty() {
        return Ok(rings);
    }

    let clipper = &mut engines.clipper;
    clipper.clear();
    let what = format!("{:?} '{}'", group.kind, group.key);
    add_logged(clipper, &rings, PolyType::Subject, &what)?;
    let merged = clipper.execute(ClipType::Union, FillRule::NonZero, FillRule::NonZero);
    clipper.clear();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::area;

    #[test]
    fn groups_follow_priority_then_first_appearance() {
        let layers = vec![
            LayerInput::new(LayerKind::Surface, "grass"),
            LayerInput::new(LayerKind::Water, "lake"),
            LayerInput::new(LayerKind::Surface, "sand"),
            LayerInput::new(LayerKind::Surface, "grass"),
            LayerInput::new(LayerKind::CarRoad, "asphalt"),
        ];
        let groups = group_layers(&layers);
        let names: Vec<(LayerKind, &str)> = groups.iter().map(|g| (g.kind, g.key)).collect();
        assert_eq!(
            names,
            vec![
                (LayerKind::Water, "lake"),
                (LayerKind::CarRoad, "asphalt"),
                (LayerKind::Surface, "grass"),
                (LayerKind::Surface, "sand"),
            ]
        );
        assert_eq!(groups[2].inputs.len(), 2);
        assert!(!groups[0].has_paths());
    }

    #[test]
    fn overlapping_inputs_are_merged() {
        let layer = LayerInput::new(LayerKind::Water, "lake")
            .with_path(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]])
            .with_path(vec![[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0]]);
        let layers = [layer];
        let groups = group_layers(&layers);
        let config = PipelineConfig::default().with_scale(100.0);
        let mut engines = Engines::default();
        let out = union_group(&mut engines, &groups[0], &config).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(area(&out[0]), 7.0 * 100.0 * 100.0);
    }

    #[test]
    fn road_centre_lines_are_widened() {
        let road = LayerInput::new(LayerKind::CarRoad, "asphalt")
            .with_path(vec![[0.0, 0.0], [10.0, 0.0]])
            .with_width(2.0);
        let layers = [road];
        let groups = group_layers(&layers);
        let config = PipelineConfig::default()
            .with_scale(100.0)
            .with_road_end(EndType::OpenButt);
        let mut engines = Engines::default();
        let out = union_group(&mut engines, &groups[0], &config).unwrap();
        assert_eq!(out.len(), 1);
        let a = area(&out[0]) / (100.0 * 100.0);
        assert!((a - 20.0).abs() < 0.05, "area {}", a);
    }

    #[test]
    fn non_finite_paths_are_skipped() {
        let layer = LayerInput::new(LayerKind::Water, "lake")
            .with_path(vec![[0.0, 0.0], [f64::NAN, 0.0], [1.0, 1.0]])
            .with_path(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
        let layers = [layer];
        let groups = group_layers(&layers);
        let mut engines = Engines::default();
        let out = union_group(&mut engines, &groups[0], &PipelineConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
    }
}
