// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Constrained quality triangulation.
//
// Design:
//   - Triangles live in a BucketAlloc arena and refer to each other by index.
//     INVALID (u32::MAX) stands for the exterior wherever a neighbour or a
//     subsegment is absent.
//   - Triangle t = (v0, v1, v2) is counter-clockwise. Edge i joins v[i+1] and
//     v[i+2] (opposite v[i]); n[i] is the triangle across it and s[i] the
//     subsegment lying on it.
//   - Subsegments store their endpoints only. The triangles on either side
//     are found through the vertex back-references when needed.
//   - The initial Delaunay triangulation comes from the half-edge mesh
//     (mesh::delaunay); everything after that works on the arena.

mod carve;
mod constrain;
mod insert;
mod quality;
#[cfg(test)]
mod tests;

use log::{debug, error};

use crate::bucketalloc::BucketAlloc;
use crate::error::TriangulationError;
use crate::mesh::{Mesh, INVALID};
use crate::polygon::Polygon;
use crate::predicates::{orient2d, Point};

pub use quality::{QualityOptions, QualityStats, TrianglePredicate};

/// Where a vertex came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexKind {
    /// Supplied by the caller.
    Input,
    /// Inserted on a constrained segment.
    Boundary,
    /// Inserted in the interior by refinement.
    Steiner,
}

#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub p: Point,
    pub kind: VertexKind,
    /// Marker of the segment a boundary vertex was inserted on.
    pub marker: u32,
    /// Some triangle using this vertex. Only a hint: it may be stale.
    pub(crate) tri: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub v: [u32; 3],
    pub n: [u32; 3],
    pub s: [u32; 3],
    pub area: f64,
}

impl Default for Triangle {
    fn default() -> Self {
        Triangle {
            v: [INVALID; 3],
            n: [INVALID; 3],
            s: [INVALID; 3],
            area: 0.0,
        }
    }
}

impl Triangle {
    /// Local index of vertex `v`.
    #[inline]
    pub fn corner(&self, v: u32) -> Option<usize> {
        self.v.iter().position(|&w| w == v)
    }
}

/// A piece of a constrained segment that is an edge of the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subsegment {
    pub v: [u32; 2],
    pub marker: u32,
    /// Input segments lying on this piece; coincident edges each count.
    pub count: u32,
    /// Endpoints of the input segment this piece was cut from.
    pub origin: [u32; 2],
}

/// Which triangles carving keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum CarveRule {
    /// Remove everything reachable from the unprotected hull or from a hole
    /// locator without crossing a segment.
    #[default]
    HoleSeeds,
    /// Keep triangles separated from the exterior by an odd number of
    /// segment crossings. Hole locators are ignored.
    EvenOdd,
}

/// How constrained segments are brought into the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintOptions {
    /// Recover segments by inserting midpoints until each piece is a
    /// Delaunay edge. When false, segments are forced in by edge flips.
    pub conforming_delaunay: bool,
    /// Allow refinement to split segments encroached by a new vertex.
    pub split_segments: bool,
    /// Bisection depth after which conforming recovery falls back to flips.
    pub max_split_depth: u32,
    /// Where two segments cross, insert their intersection and split both.
    /// When false the crossing is reported as an error.
    pub split_crossings: bool,
    pub carve_rule: CarveRule,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        ConstraintOptions {
            conforming_delaunay: false,
            split_segments: true,
            max_split_depth: 8,
            split_crossings: true,
            carve_rule: CarveRule::HoleSeeds,
        }
    }
}

impl ConstraintOptions {
    pub fn with_split_crossings(mut self, split: bool) -> Self {
        self.split_crossings = split;
        self
    }

    pub fn with_carve_rule(mut self, rule: CarveRule) -> Self {
        self.carve_rule = rule;
        self
    }

    pub fn with_conforming_delaunay(mut self, conforming: bool) -> Self {
        self.conforming_delaunay = conforming;
        self
    }

    pub fn with_split_segments(mut self, split: bool) -> Self {
        self.split_segments = split;
        self
    }

    pub fn with_max_split_depth(mut self, depth: u32) -> Self {
        self.max_split_depth = depth;
        self
    }
}

/// Flat output: vertex coordinates, counter-clockwise index triples and the
/// constrained edges that survived carving.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct TriangleMesh {
    pub vertices: Vec<[f64; 2]>,
    pub triangles: Vec<[u32; 3]>,
    pub segments: Vec<[u32; 2]>,
}

impl TriangleMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Sum of the triangle areas.
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.vertices[i as usize]);
                0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]))
            })
            .sum()
    }
}

/// Result of a point location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Location {
    Inside(u32),
    OnEdge(u32, usize),
    /// A triangle and the corner vertex `p` coincides with.
    OnVertex(u32, u32),
    Outside,
}

/// A triangle mesh under construction.
#[derive(Clone, Debug, Default)]
pub struct Triangulation {
    pub(crate) verts: Vec<Vertex>,
    pub(crate) tris: BucketAlloc<Triangle>,
    pub(crate) subsegs: Vec<Subsegment>,
    /// Caller point index to vertex id. Duplicates share the first copy's id.
    pub(crate) input_map: Vec<u32>,
    pub(crate) steiner: usize,
    /// Start of the next point-location walk.
    pub(crate) recent: u32,
}

#[inline]
pub(crate) fn next(i: usize) -> usize {
    (i + 1) % 3
}

#[inline]
pub(crate) fn prev(i: usize) -> usize {
    (i + 2) % 3
}

impl Triangulation {
    fn clear(&mut self) {
        self.verts.clear();
        self.tris.clear();
        self.subsegs.clear();
        self.input_map.clear();
        self.steiner = 0;
        self.recent = INVALID;
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.tris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }

    /// Vertices inserted after the initial triangulation.
    pub fn steiner_count(&self) -> usize {
        self.steiner
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.verts
    }

    pub fn triangles(&self) -> impl Iterator<Item = (u32, &Triangle)> {
        self.tris.iter()
    }

    /// Vertex id that caller point `i` was merged into.
    pub fn vertex_of_input(&self, i: usize) -> Option<u32> {
        self.input_map.get(i).copied()
    }

    #[inline]
    pub(crate) fn pt(&self, v: u32) -> Point {
        self.verts[v as usize].p
    }

    pub(crate) fn add_vertex(&mut self, p: Point, kind: VertexKind, marker: u32) -> u32 {
        self.verts.push(Vertex {
            p,
            kind,
            marker,
            tri: INVALID,
        });
        if kind != VertexKind::Input {
            self.steiner += 1;
        }
        (self.verts.len() - 1) as u32
    }

    /// Overwrite triangle `t`, refreshing its area and the vertex hints.
    pub(crate) fn set_tri(&mut self, t: u32, v: [u32; 3], n: [u32; 3], s: [u32; 3]) {
        let [a, b, c] = v.map(|i| self.pt(i));
        let area = 0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x));
        self.tris[t] = Triangle { v, n, s, area };
        for w in v {
            self.verts[w as usize].tri = t;
        }
        self.recent = t;
    }

    /// Point `u`'s link that currently names `old` at `new`.
    pub(crate) fn replace_neighbor(&mut self, u: u32, old: u32, new: u32) {
        if u == INVALID {
            return;
        }
        let tri = &mut self.tris[u];
        if let Some(j) = tri.n.iter().position(|&x| x == old) {
            tri.n[j] = new;
        }
    }

    /// Point `u`'s link across edge (x, y) at `new`. The edge is given in
    /// `u`'s own counter-clockwise order.
    pub(crate) fn relink(&mut self, u: u32, x: u32, y: u32, new: u32) {
        if u == INVALID {
            return;
        }
        let tri = &mut self.tris[u];
        for j in 0..3 {
            if tri.v[next(j)] == x && tri.v[prev(j)] == y {
                tri.n[j] = new;
                return;
            }
        }
    }

    /// Index of the edge of `u` that faces `t`.
    pub(crate) fn slot_of(&self, u: u32, t: u32) -> Result<usize, TriangulationError> {
        self.tris[u].n.iter().position(|&x| x == t).ok_or_else(|| {
            TriangulationError::Internal(format!("triangle {} does not link back to {}", u, t))
        })
    }

    /// Some live triangle using `v`. Every mutation refreshes the hint, so
    /// the walk only runs when a hint was left behind by a removal.
    fn any_triangle_with(&self, v: u32) -> Option<u32> {
        let hint = self.verts[v as usize].tri;
        if hint == INVALID {
            return None;
        }
        if self.tris.get(hint).map_or(false, |t| t.v.contains(&v)) {
            return Some(hint);
        }
        match self.locate(self.pt(v), hint) {
            Location::OnVertex(t, w) if w == v => Some(t),
            _ => None,
        }
    }

    /// Every live triangle using vertex `v`.
    pub(crate) fn triangles_around(&self, v: u32) -> Vec<u32> {
        let start = match self.any_triangle_with(v) {
            Some(t) => t,
            None => return Vec::new(),
        };
        let mut out = vec![start];
        let limit = self.tris.len();
        // Counter-clockwise first.
        let mut t = start;
        let mut closed = false;
        for _ in 0..limit {
            let k = match self.tris[t].corner(v) {
                Some(k) => k,
                None => break,
            };
            let n = self.tris[t].n[next(k)];
            if n == INVALID {
                break;
            }
            if n == start {
                closed = true;
                break;
            }
            out.push(n);
            t = n;
        }
        if closed {
            return out;
        }
        // Open fan on the boundary: finish clockwise.
        let mut t = start;
        for _ in 0..limit {
            let k = match self.tris[t].corner(v) {
                Some(k) => k,
                None => break,
            };
            let n = self.tris[t].n[prev(k)];
            if n == INVALID || out.contains(&n) {
                break;
            }
            out.push(n);
            t = n;
        }
        out
    }

    /// Triangle and edge index of the edge joining `a` and `b`.
    pub(crate) fn find_edge(&self, a: u32, b: u32) -> Option<(u32, usize)> {
        for t in self.triangles_around(a) {
            let tri = &self.tris[t];
            let k = tri.corner(a)?;
            if tri.v[next(k)] == b {
                return Some((t, prev(k)));
            }
            if tri.v[prev(k)] == b {
                return Some((t, next(k)));
            }
        }
        None
    }

    fn classify(&self, t: u32, p: Point) -> Option<Location> {
        let tri = &self.tris[t];
        let mut zero = [false; 3];
        for i in 0..3 {
            let o = orient2d(self.pt(tri.v[next(i)]), self.pt(tri.v[prev(i)]), p);
            if o < 0.0 {
                return None;
            }
            zero[i] = o == 0.0;
        }
        Some(match zero {
            [false, false, false] => Location::Inside(t),
            [true, false, false] => Location::OnEdge(t, 0),
            [false, true, false] => Location::OnEdge(t, 1),
            [false, false, true] => Location::OnEdge(t, 2),
            [false, true, true] => Location::OnVertex(t, tri.v[0]),
            [true, false, true] => Location::OnVertex(t, tri.v[1]),
            [true, true, false] => Location::OnVertex(t, tri.v[2]),
            // Only a degenerate triangle can be flat against p on all sides.
            [true, true, true] => return None,
        })
    }

    /// Locate `p` with a visibility walk, falling back to a scan when the
    /// walk runs off a boundary or cycles.
    pub(crate) fn locate(&self, p: Point, hint: u32) -> Location {
        let mut t = if self.tris.contains(hint) {
            hint
        } else if self.tris.contains(self.recent) {
            self.recent
        } else {
            match self.tris.iter().next() {
                Some((i, _)) => i,
                None => return Location::Outside,
            }
        };
        let limit = self.tris.len() + 3;
        'walk: for step in 0..limit {
            let tri = &self.tris[t];
            for k in 0..3 {
                // Rotate the first edge tried so a walk cannot settle into a loop.
                let i = (k + step) % 3;
                let o = orient2d(self.pt(tri.v[next(i)]), self.pt(tri.v[prev(i)]), p);
                if o < 0.0 {
                    if tri.n[i] == INVALID {
                        break 'walk;
                    }
                    t = tri.n[i];
                    continue 'walk;
                }
            }
            if let Some(loc) = self.classify(t, p) {
                return loc;
            }
            break;
        }
        self.tris
            .iter()
            .find_map(|(i, _)| self.classify(i, p))
            .unwrap_or(Location::Outside)
    }

    /// Verify orientation, neighbour reciprocity and subsegment agreement.
    pub fn check_consistency(&self) -> Result<(), TriangulationError> {
        for (t, tri) in self.tris.iter() {
            let [a, b, c] = tri.v.map(|v| self.pt(v));
            if orient2d(a, b, c) <= 0.0 {
                return Err(TriangulationError::Internal(format!(
                    "triangle {} is not counter-clockwise",
                    t
                )));
            }
            for i in 0..3 {
                let u = tri.n[i];
                if u == INVALID {
                    continue;
                }
                let other = self.tris.get(u).ok_or_else(|| {
                    TriangulationError::Internal(format!("triangle {} links to dead triangle {}", t, u))
                })?;
                let j = other.n.iter().position(|&x| x == t).ok_or_else(|| {
                    TriangulationError::Internal(format!(
                        "neighbour link {} -> {} is not reciprocal",
                        t, u
                    ))
                })?;
                if other.v[next(j)] != tri.v[prev(i)] || other.v[prev(j)] != tri.v[next(i)] {
                    return Err(TriangulationError::Internal(format!(
                        "triangles {} and {} disagree about their shared edge",
                        t, u
                    )));
                }
                if other.s[j] != tri.s[i] {
                    return Err(TriangulationError::Internal(format!(
                        "triangles {} and {} disagree about subsegment {}",
                        t, u, tri.s[i]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Run the consistency check in debug builds only.
    pub(crate) fn debug_check(&self, phase: &str) -> Result<(), TriangulationError> {
        if cfg!(debug_assertions) {
            if let Err(e) = self.check_consistency() {
                error!("mesh corrupt after {}: {}", phase, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Renumber the live part of the mesh into flat buffers.
    pub fn to_mesh(&self) -> TriangleMesh {
        let mut remap = vec![INVALID; self.verts.len()];
        for (_, tri) in self.tris.iter() {
            for v in tri.v {
                remap[v as usize] = 0;
            }
        }
        let mut out = TriangleMesh::default();
        for (v, slot) in remap.iter_mut().enumerate() {
            if *slot != INVALID {
                *slot = out.vertices.len() as u32;
                let p = self.verts[v].p;
                out.vertices.push([p.x, p.y]);
            }
        }
        let mut seen = vec![false; self.subsegs.len()];
        for (_, tri) in self.tris.iter() {
            out.triangles.push(tri.v.map(|v| remap[v as usize]));
            for i in 0..3 {
                let s = tri.s[i];
                if s != INVALID && !seen[s as usize] {
                    seen[s as usize] = true;
                    out.segments.push([
                        remap[tri.v[next(i)] as usize],
                        remap[tri.v[prev(i)] as usize],
                    ]);
                }
            }
        }
        out
    }
}

/// Reusable triangulation engine. Holds scratch buffers and recycled arenas
/// so repeated calls on one thread do not reallocate.
#[derive(Debug, Default)]
pub struct Triangulator {
    mesh: Mesh,
    order: Vec<u32>,
    spare: Vec<Triangulation>,
}

impl Triangulator {
    pub fn new() -> Self {
        Triangulator::default()
    }

    /// Delaunay triangulation of a point set. Duplicate points are merged
    /// into their first occurrence.
    pub fn triangulate(&mut self, points: &[Point]) -> Result<Triangulation, TriangulationError> {
        if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(TriangulationError::NonFinite { x: p.x, y: p.y });
        }
        let mut out = self.spare.pop().unwrap_or_default();
        out.clear();

        self.order.clear();
        self.order.extend(0..points.len() as u32);
        self.order.sort_by(|&a, &b| {
            let (pa, pb) = (points[a as usize], points[b as usize]);
            pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
        });

        // The stable sort leaves the earliest copy first in each run.
        let mut rep = vec![0u32; points.len()];
        let mut run_start = INVALID;
        for &i in &self.order {
            if run_start == INVALID || points[run_start as usize] != points[i as usize] {
                run_start = i;
            }
            rep[i as usize] = run_start;
        }
        out.input_map.resize(points.len(), INVALID);
        for i in 0..points.len() {
            let r = rep[i] as usize;
            out.input_map[i] = if r == i {
                out.add_vertex(points[i], VertexKind::Input, 0)
            } else {
                out.input_map[r]
            };
        }

        let distinct = out.verts.len();
        if distinct < 3 {
            self.spare.push(out);
            return Err(TriangulationError::TooFewPoints(distinct));
        }

        let mut sorted: Vec<u32> = Vec::with_capacity(distinct);
        for &i in &self.order {
            if rep[i as usize] == i {
                sorted.push(out.input_map[i as usize]);
            }
        }
        let positions: Vec<Point> = out.verts.iter().map(|v| v.p).collect();
        self.mesh.delaunay(&positions, &sorted);
        let faces = self.mesh.faces(&positions);
        if faces.is_empty() {
            self.spare.push(out);
            return Err(TriangulationError::TooFewPoints(distinct));
        }

        for f in &faces {
            let t = out.tris.insert(Triangle::default());
            out.set_tri(t, f.v, f.n, [INVALID; 3]);
        }
        out.debug_check("delaunay")?;
        debug!(
            "delaunay: {} points ({} distinct) -> {} triangles",
            points.len(),
            distinct,
            faces.len()
        );
        Ok(out)
    }

    /// Force the polygon's segments into `mesh`, carve away the exterior and
    /// the holes, then refine when `quality` is given.
    ///
    /// `mesh` must have been built from `polygon.points`.
    pub fn apply_constraints(
        &self,
        mesh: &mut Triangulation,
        polygon: &Polygon,
        constraints: &ConstraintOptions,
        quality: Option<&QualityOptions>,
    ) -> Result<(), TriangulationError> {
        if polygon.points.len() != mesh.input_map.len() {
            return Err(TriangulationError::PointCountMismatch {
                polygon: polygon.points.len(),
                mesh: mesh.input_map.len(),
            });
        }
        for seg in &polygon.segments {
            for v in [seg.a, seg.b] {
                if v as usize >= mesh.input_map.len() {
                    return Err(TriangulationError::UnknownVertex(v));
                }
            }
        }

        for seg in &polygon.segments {
            let a = mesh.input_map[seg.a as usize];
            let b = mesh.input_map[seg.b as usize];
            mesh.insert_segment(a, b, seg.marker, constraints)?;
        }
        mesh.debug_check("segment recovery")?;

        let removed = mesh.carve(&polygon.holes, constraints.carve_rule)?;
        mesh.debug_check("carving")?;

        if let Some(q) = quality {
            mesh.refine(q, constraints)?;
            mesh.debug_check("refinement")?;
        }
        debug!(
            "constraints: {} segments, {} triangles carved, {} kept, {} Steiner points",
            polygon.segments.len(),
            removed,
            mesh.triangle_count(),
            mesh.steiner_count()
        );
        Ok(())
    }

    /// `triangulate` followed by `apply_constraints`.
    pub fn triangulate_polygon(
        &mut self,
        polygon: &Polygon,
        constraints: &ConstraintOptions,
        quality: Option<&QualityOptions>,
    ) -> Result<Triangulation, TriangulationError> {
        let mut mesh = self.triangulate(&polygon.points)?;
        match self.apply_constraints(&mut mesh, polygon, constraints, quality) {
            Ok(()) => Ok(mesh),
            Err(e) => {
                self.recycle(mesh);
                Err(e)
            }
        }
    }

    /// Hand a finished mesh back so the next call can reuse its storage.
    pub fn recycle(&mut self, mesh: Triangulation) {
        self.spare.push(mesh);
    }
}
