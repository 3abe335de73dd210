// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Polygon and polyline offsetting.
//
// Every vertex of a path is pushed out along the unit normals of its two
// edges. Convex corners get a join (square, round or miter), concave corners
// a plain notch that the cleanup union folds away. Open paths are walked
// forwards and then backwards so both sides and both end caps are emitted
// as one closed outline.

use std::f64::consts::PI;

use log::{debug, trace};

use crate::clip::{ClipType, Clipper, FillRule};
use crate::error::ClipError;
use crate::geom::{area, bounds, round, FloatPoint, IntPoint, Path, Paths};
use crate::sweep::PolyType;

const TWO_PI: f64 = PI * 2.0;
const DEFAULT_ARC_TOLERANCE: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinType {
    #[default]
    Square,
    Round,
    Miter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum EndType {
    #[default]
    ClosedPolygon,
    /// A closed path offset on both sides, leaving a band.
    ClosedLine,
    OpenButt,
    OpenSquare,
    OpenRound,
}

impl EndType {
    fn is_closed(self) -> bool {
        matches!(self, EndType::ClosedPolygon | EndType::ClosedLine)
    }
}

#[derive(Clone, Debug)]
struct OffsetPath {
    points: Path,
    join: JoinType,
    end: EndType,
}

/// Paths added together share one offset distance.
#[derive(Clone, Debug)]
struct OffsetGroup {
    delta: f64,
    paths: Vec<OffsetPath>,
    /// (path, vertex) of the lowest closed-polygon vertex.
    lowest: Option<(usize, usize)>,
}

/// Grows or shrinks paths by a per-path distance.
///
/// ```
/// use tilemesh::{EndType, IntPoint, JoinType, Offsetter};
/// let mut off = Offsetter::new(2.0, 0.25);
/// off.add_path(&[IntPoint::new(0, 0), IntPoint::new(10, 0)], 1.0, JoinType::Square, EndType::OpenSquare);
/// let out = off.execute().unwrap();
/// assert_eq!(out.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Offsetter {
    pub miter_limit: f64,
    pub arc_tolerance: f64,
    groups: Vec<OffsetGroup>,
}

impl Default for Offsetter {
    fn default() -> Self {
        Self::new(2.0, DEFAULT_ARC_TOLERANCE)
    }
}

impl Offsetter {
    pub fn new(miter_limit: f64, arc_tolerance: f64) -> Self {
        Offsetter {
            miter_limit,
            arc_tolerance,
            groups: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn add_path(&mut self, path: &[IntPoint], delta: f64, join: JoinType, end: EndType) {
        self.add_paths(std::slice::from_ref(&path.to_vec()), delta, join, end);
    }

    pub fn add_paths(&mut self, paths: &[Path], delta: f64, join: JoinType, end: EndType) {
        let mut group = OffsetGroup {
            delta,
            paths: Vec::with_capacity(paths.len()),
            lowest: None,
        };
        for path in paths {
            if path.is_empty() {
                continue;
            }
            let mut high = path.len() - 1;
            if end.is_closed() {
                while high > 0 && path[0] == path[high] {
                    high -= 1;
                }
            }
            // Drop repeats and find the lowest vertex (largest Y, then smallest X).
            let mut points: Path = Vec::with_capacity(high + 1);
            points.push(path[0]);
            let mut k = 0;
            for &pt in &path[1..=high] {
                if *points.last().unwrap_or(&pt) != pt {
                    points.push(pt);
                    let low = points[k];
                    if pt.y > low.y || (pt.y == low.y && pt.x < low.x) {
                        k = points.len() - 1;
                    }
                }
            }
            if end == EndType::ClosedPolygon && points.len() < 3 {
                trace!("offset path with {} vertices skipped", points.len());
                continue;
            }
            let idx = group.paths.len();
            if end == EndType::ClosedPolygon {
                let replace = match group.lowest {
                    None => true,
                    Some((p, v)) => {
                        let cur = group.paths[p].points[v];
                        let cand = points[k];
                        cand.y > cur.y || (cand.y == cur.y && cand.x < cur.x)
                    }
                };
                if replace {
                    group.lowest = Some((idx, k));
                }
            }
            group.paths.push(OffsetPath { points, join, end });
        }
        if !group.paths.is_empty() {
            self.groups.push(group);
        }
    }

    /// Offset every group and merge the outlines.
    pub fn execute(&mut self) -> Result<Paths, ClipError> {
        let mut per_group = Vec::with_capacity(self.groups.len());
        for group in self.groups.iter_mut() {
            fix_orientations(group);
            let raw = offset_group(group, self.miter_limit, self.arc_tolerance);
            per_group.push(clean_up(raw, group.delta)?);
        }
        let result = match per_group.len() {
            0 => Vec::new(),
            1 => per_group.pop().unwrap_or_default(),
            _ => {
                // Outlines of different groups may overlap.
                let mut c = Clipper::new();
                for paths in &per_group {
                    c.add_paths(paths, PolyType::Subject, true)?;
                }
                c.execute(ClipType::Union, FillRule::NonZero, FillRule::NonZero)?
            }
        };
        debug!(
            "offset {} groups into {} rings",
            self.groups.len(),
            result.len()
        );
        Ok(result)
    }
}

/// Make the closed polygon with the lowest vertex an outer ring, reversing
/// every closed path when it is not. Closed lines always run counter-clockwise.
fn fix_orientations(group: &mut OffsetGroup) {
    let flip = group
        .lowest
        .map(|(p, _)| area(&group.paths[p].points) < 0.0)
        .unwrap_or(false);
    for path in group.paths.iter_mut() {
        let positive = area(&path.points) >= 0.0;
        let reverse = match path.end {
            EndType::ClosedPolygon => flip,
            EndType::ClosedLine => flip == positive,
            _ => false,
        };
        if reverse {
            path.points.reverse();
        }
    }
}

fn clean_up(raw: Paths, delta: f64) -> Result<Paths, ClipError> {
    if raw.is_empty() {
        return Ok(raw);
    }
    let mut c = Clipper::new();
    c.add_paths(&raw, PolyType::Subject, true)?;
    if delta > 0.0 {
        return c.execute(ClipType::Union, FillRule::Positive, FillRule::Positive);
    }
    // Shrinking: wrap everything in a reversed frame and keep what is left
    // inside it, then drop the frame.
    let r = bounds(&raw);
    let outer = vec![
        IntPoint::new(r.left - 10, r.bottom + 10),
        IntPoint::new(r.right + 10, r.bottom + 10),
        IntPoint::new(r.right + 10, r.top - 10),
        IntPoint::new(r.left - 10, r.top - 10),
    ];
    c.add_path(&outer, PolyType::Subject, true)?;
    let mut opts = c.options();
    opts.reverse_solution = true;
    c.set_options(opts);
    let mut out = c.execute(ClipType::Union, FillRule::Negative, FillRule::Negative)?;
    let frame = out
        .iter()
        .enumerate()
        .max_by(|a, b| area(a.1).abs().total_cmp(&area(b.1).abs()))
        .map(|(i, _)| i);
    if let Some(i) = frame {
        out.remove(i);
    }
    Ok(out)
}

fn unit_normal(pt1: IntPoint, pt2: IntPoint) -> FloatPoint {
    let dx = (pt2.x - pt1.x) as f64;
    let dy = (pt2.y - pt1.y) as f64;
    if dx == 0.0 && dy == 0.0 {
        return FloatPoint::default();
    }
    let f = 1.0 / (dx * dx + dy * dy).sqrt();
    FloatPoint::new(dy * f, -dx * f)
}

/// Per-path working state while one outline is generated.
struct Outline<'a> {
    src: &'a [IntPoint],
    normals: Vec<FloatPoint>,
    dest: Path,
    delta: f64,
    sin_a: f64,
    sin: f64,
    cos: f64,
    steps_per_rad: f64,
    miter_lim: f64,
}

impl<'a> Outline<'a> {
    fn push_along(&mut self, j: usize, n: FloatPoint) {
        let p = self.src[j];
        self.dest.push(IntPoint::new(
            round(p.x as f64 + n.x * self.delta),
            round(p.y as f64 + n.y * self.delta),
        ));
    }

    fn offset_point(&mut self, j: usize, k: &mut usize, join: JoinType) {
        let (nk, nj) = (self.normals[*k], self.normals[j]);
        self.sin_a = nk.x * nj.y - nj.x * nk.y;
        if (self.sin_a * self.delta).abs() < 1.0 {
            let cos_a = nk.x * nj.x + nj.y * nk.y;
            if cos_a > 0.0 {
                // Nearly straight: a single vertex is enough.
                self.push_along(j, nk);
                return;
            }
        } else {
            self.sin_a = self.sin_a.clamp(-1.0, 1.0);
        }

        if self.sin_a * self.delta < 0.0 {
            // Concave corner.
            self.push_along(j, nk);
            self.dest.push(self.src[j]);
            self.push_along(j, nj);
        } else {
            match join {
                JoinType::Miter => {
                    let r = 1.0 + (nj.x * nk.x + nj.y * nk.y);
                    if r >= self.miter_lim {
                        self.do_miter(j, *k, r);
                    } else {
                        self.do_square(j, *k);
                    }
                }
                JoinType::Square => self.do_square(j, *k),
                JoinType::Round => self.do_round(j, *k),
            }
        }
        *k = j;
    }

    fn do_square(&mut self, j: usize, k: usize) {
        let (nk, nj) = (self.normals[k], self.normals[j]);
        let dx = (self.sin_a.atan2(nk.x * nj.x + nk.y * nj.y) / 4.0).tan();
        let p = self.src[j];
        self.dest.push(IntPoint::new(
            round(p.x as f64 + self.delta * (nk.x - nk.y * dx)),
            round(p.y as f64 + self.delta * (nk.y + nk.x * dx)),
        ));
        self.dest.push(IntPoint::new(
            round(p.x as f64 + self.delta * (nj.x + nj.y * dx)),
            round(p.y as f64 + self.delta * (nj.y - nj.x * dx)),
        ));
    }

    fn do_miter(&mut self, j: usize, k: usize, r: f64) {
        let (nk, nj) = (self.normals[k], self.normals[j]);
        let q = self.delta / r;
        let p = self.src[j];
        self.dest.push(IntPoint::new(
            round(p.x as f64 + (nk.x + nj.x) * q),
            round(p.y as f64 + (nk.y + nj.y) * q),
        ));
    }

    fn do_round(&mut self, j: usize, k: usize) {
        let (nk, nj) = (self.normals[k], self.normals[j]);
        let a = self.sin_a.atan2(nk.x * nj.x + nk.y * nj.y);
        let steps = (round(self.steps_per_rad * a.abs()) as i64).max(1);
        let (mut x, mut y) = (nk.x, nk.y);
        for _ in 0..steps {
            self.push_along(j, FloatPoint::new(x, y));
            let x2 = x;
            x = x * self.cos - self.sin * y;
            y = x2 * self.sin + y * self.cos;
        }
        self.push_along(j, nj);
    }

    fn take(&mut self) -> Path {
        std::mem::take(&mut self.dest)
    }
}

fn offset_group(group: &OffsetGroup, miter_limit: f64, arc_tolerance: f64) -> Paths {
    let delta = group.delta;
    let mut out = Vec::with_capacity(group.paths.len() * 2);
    if delta.abs() < 1e-20 {
        for path in &group.paths {
            if path.end == EndType::ClosedPolygon {
                out.push(path.points.clone());
            }
        }
        return out;
    }

    let miter_lim = if miter_limit > 2.0 {
        2.0 / (miter_limit * miter_limit)
    } else {
        0.5
    };
    let y = if arc_tolerance <= 0.0 {
        DEFAULT_ARC_TOLERANCE
    } else if arc_tolerance > delta.abs() * DEFAULT_ARC_TOLERANCE {
        delta.abs() * DEFAULT_ARC_TOLERANCE
    } else {
        arc_tolerance
    };
    let steps = PI / (1.0 - y / delta.abs()).acos();
    let mut sin = (TWO_PI / steps).sin();
    let cos = (TWO_PI / steps).cos();
    if delta < 0.0 {
        sin = -sin;
    }

    for path in &group.paths {
        let src = &path.points[..];
        let len = src.len();
        if len == 0 || (delta <= 0.0 && (len < 3 || path.end != EndType::ClosedPolygon)) {
            continue;
        }
        let mut o = Outline {
            src,
            normals: Vec::with_capacity(len),
            dest: Vec::new(),
            delta,
            sin_a: 0.0,
            sin,
            cos,
            steps_per_rad: steps / TWO_PI,
            miter_lim,
        };

        if len == 1 {
            // A lone point becomes a circle or a square.
            if path.join == JoinType::Round {
                let (mut x, mut yy) = (1.0, 0.0);
                let mut j = 1.0;
                while j <= steps {
                    o.push_along(0, FloatPoint::new(x, yy));
                    let x2 = x;
                    x = x * cos - sin * yy;
                    yy = x2 * sin + yy * cos;
                    j += 1.0;
                }
            } else {
                let (mut x, mut yy) = (-1.0, -1.0);
                for _ in 0..4 {
                    o.push_along(0, FloatPoint::new(x, yy));
                    if x < 0.0 {
                        x = 1.0;
                    } else if yy < 0.0 {
                        yy = 1.0;
                    } else {
                        x = -1.0;
                    }
                }
            }
            out.push(o.take());
            continue;
        }

        for j in 0..len - 1 {
            o.normals.push(unit_normal(src[j], src[j + 1]));
        }
        if path.end.is_closed() {
            o.normals.push(unit_normal(src[len - 1], src[0]));
        } else {
            let last = o.normals[len - 2];
            o.normals.push(last);
        }

        match path.end {
            EndType::ClosedPolygon => {
                let mut k = len - 1;
                for j in 0..len {
                    o.offset_point(j, &mut k, path.join);
                }
                out.push(o.take());
            }
            EndType::ClosedLine => {
                let mut k = len - 1;
                for j in 0..len {
                    o.offset_point(j, &mut k, path.join);
                }
                out.push(o.take());
                // Same ring, other side.
                let n = o.normals[len - 1];
                for j in (1..len).rev() {
                    let p = o.normals[j - 1];
                    o.normals[j] = FloatPoint::new(-p.x, -p.y);
                }
                o.normals[0] = FloatPoint::new(-n.x, -n.y);
                k = 0;
                for j in (0..len).rev() {
                    o.offset_point(j, &mut k, path.join);
                }
                out.push(o.take());
            }
            EndType::OpenButt | EndType::OpenSquare | EndType::OpenRound => {
                let mut k = 0;
                for j in 1..len - 1 {
                    o.offset_point(j, &mut k, path.join);
                }
                let j = len - 1;
                if path.end == EndType::OpenButt {
                    let n = o.normals[j];
                    o.push_along(j, n);
                    o.push_along(j, FloatPoint::new(-n.x, -n.y));
                } else {
                    o.sin_a = 0.0;
                    let n = o.normals[j];
                    o.normals[j] = FloatPoint::new(-n.x, -n.y);
                    if path.end == EndType::OpenSquare {
                        o.do_square(j, len - 2);
                    } else {
                        o.do_round(j, len - 2);
                    }
                }

                // Walk back along the other side.
                for j in (1..len).rev() {
                    let p = o.normals[j - 1];
                    o.normals[j] = FloatPoint::new(-p.x, -p.y);
                }
                let n1 = o.normals[1];
                o.normals[0] = FloatPoint::new(-n1.x, -n1.y);
                k = len - 1;
                for j in (1..len - 1).rev() {
                    o.offset_point(j, &mut k, path.join);
                }
                if path.end == EndType::OpenButt {
                    let n = o.normals[0];
                    o.push_along(0, FloatPoint::new(-n.x, -n.y));
                    o.push_along(0, n);
                } else {
                    o.sin_a = 0.0;
                    if path.end == EndType::OpenSquare {
                        o.do_square(0, 1);
                    } else {
                        o.do_round(0, 1);
                    }
                }
                out.push(o.take());
            }
        }
    }
    out
}
