// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Segment recovery: conforming bisection or flip-based constrained insertion.

use std::collections::VecDeque;

use log::trace;

use super::insert::Inserted;
use super::{next, prev, ConstraintOptions, Subsegment, Triangulation, VertexKind};
use crate::error::TriangulationError;
use crate::mesh::INVALID;
use crate::predicates::{incircle, orient2d, Point};

/// What lies between two vertices along the straight line joining them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Trace {
    /// They are already joined by edge `i` of triangle `t`.
    Edge(u32, usize),
    /// The open segment passes exactly through this vertex.
    Through(u32),
    /// The segment crosses these edges, nearest `a` first.
    Crosses(Vec<(u32, u32)>),
    /// The segment runs into the subsegment on edge `i` of triangle `t`.
    Blocked(u32, usize),
}

fn signs_differ(p: f64, q: f64) -> bool {
    (p > 0.0 && q < 0.0) || (p < 0.0 && q > 0.0)
}

/// Open segments a-b and p-q cross at a single interior point.
fn crosses(a: Point, b: Point, p: Point, q: Point) -> bool {
    signs_differ(orient2d(a, b, p), orient2d(a, b, q))
        && signs_differ(orient2d(p, q, a), orient2d(p, q, b))
}

#[inline]
fn dist(p: Point, q: Point) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}

impl Triangulation {
    /// Make a-b (or a chain of collinear pieces of it) a constrained edge.
    pub(crate) fn insert_segment(
        &mut self,
        a: u32,
        b: u32,
        marker: u32,
        opts: &ConstraintOptions,
    ) -> Result<(), TriangulationError> {
        let origin = [a, b];
        let crossing_limit = 4 * self.subsegs.len() + 64;
        let mut crossings = 0;
        let mut work = vec![(a, b, 0u32)];
        while let Some((a, b, depth)) = work.pop() {
            if a == b {
                continue;
            }
            match self.trace(a, b)? {
                Trace::Edge(t, i) => self.mark_subsegment(t, i, a, b, marker, origin),
                Trace::Through(v) => {
                    work.push((v, b, depth));
                    work.push((a, v, depth));
                }
                Trace::Blocked(t, i) => {
                    crossings += 1;
                    if !opts.split_crossings || crossings > crossing_limit {
                        return Err(TriangulationError::CrossingSegments { a, b });
                    }
                    let v = self.split_at_crossing(a, b, t, i)?;
                    work.push((v, b, depth));
                    work.push((a, v, depth));
                }
                Trace::Crosses(edges) => {
                    if opts.conforming_delaunay && depth < opts.max_split_depth {
                        let (pa, pb) = (self.pt(a), self.pt(b));
                        let mid = Point::new(0.5 * (pa.x + pb.x), 0.5 * (pa.y + pb.y));
                        let hint = self.verts[a as usize].tri;
                        match self.insert_point(mid, VertexKind::Boundary, marker, hint)? {
                            Inserted::New(v) | Inserted::Existing(v) if v != a && v != b => {
                                work.push((v, b, depth + 1));
                                work.push((a, v, depth + 1));
                            }
                            Inserted::Outside => {
                                return Err(TriangulationError::Internal(format!(
                                    "midpoint of segment {}-{} is outside the mesh",
                                    a, b
                                )))
                            }
                            // Too short to bisect further.
                            _ => self.recover_by_flips(a, b, marker, origin, edges)?,
                        }
                    } else {
                        self.recover_by_flips(a, b, marker, origin, edges)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Constrain edge `i` of `t`, or count one more input segment on it
    /// when it already is a subsegment.
    pub(crate) fn mark_subsegment(
        &mut self,
        t: u32,
        i: usize,
        a: u32,
        b: u32,
        marker: u32,
        origin: [u32; 2],
    ) {
        let existing = self.tris[t].s[i];
        if existing != INVALID {
            self.subsegs[existing as usize].count += 1;
            return;
        }
        let sub = self.subsegs.len() as u32;
        self.subsegs.push(Subsegment {
            v: [a, b],
            marker,
            count: 1,
            origin,
        });
        self.tris[t].s[i] = sub;
        let u = self.tris[t].n[i];
        if u != INVALID {
            if let Some(j) = self.tris[u].n.iter().position(|&x| x == t) {
                self.tris[u].s[j] = sub;
            }
        }
    }

    /// Segment a-b crosses the subsegment on edge `i` of `t`. Returns the
    /// vertex a-b must be routed through: the intersection, inserted and
    /// splitting the subsegment, or a subsegment endpoint it nearly meets.
    fn split_at_crossing(
        &mut self,
        a: u32,
        b: u32,
        t: u32,
        i: usize,
    ) -> Result<u32, TriangulationError> {
        let tri = self.tris[t];
        let (w, x, y) = (tri.v[i], tri.v[next(i)], tri.v[prev(i)]);
        let u = tri.n[i];
        if u == INVALID {
            return Err(TriangulationError::Internal(format!(
                "segment {}-{} crosses hull edge {}-{}",
                a, b, x, y
            )));
        }
        let d = self.tris[u].v[self.slot_of(u, t)?];
        let (pa, pb, px, py) = (self.pt(a), self.pt(b), self.pt(x), self.pt(y));

        let (ox, oy) = (orient2d(pa, pb, px), orient2d(pa, pb, py));
        let r = (ox / (ox - oy)).clamp(0.0, 1.0);
        let r = if r.is_finite() { r } else { 0.5 };
        let p = Point::new(px.x + r * (py.x - px.x), px.y + r * (py.y - px.y));

        let nearer = if dist(p, px) <= dist(p, py) { x } else { y };
        let tol = 1e-9 * (dist(pa, pb) + dist(px, py));
        if dist(p, self.pt(nearer)) <= tol {
            trace!("segment {}-{} meets subsegment {}-{} at its end {}", a, b, x, y, nearer);
            return Ok(nearer);
        }
        let fits = [(w, x), (y, w), (d, y), (x, d)]
            .iter()
            .all(|&(m, n)| orient2d(self.pt(m), self.pt(n), p) > 0.0);
        if !fits {
            return Ok(nearer);
        }

        let sub = tri.s[i];
        let marker = self.subsegs[sub as usize].marker;
        let v = self.add_vertex(p, VertexKind::Boundary, marker);
        let fresh = self.split_edge(t, i, v)?;
        self.legalize(v, &fresh)?;
        trace!("segment {}-{} split subsegment {}-{} at vertex {}", a, b, x, y, v);
        Ok(v)
    }

    /// Walk from `a` towards `b` collecting the edges in the way.
    pub(crate) fn trace(&self, a: u32, b: u32) -> Result<Trace, TriangulationError> {
        let (pa, pb) = (self.pt(a), self.pt(b));
        let fan = self.triangles_around(a);
        for &t in &fan {
            let tri = &self.tris[t];
            if let Some(k) = tri.corner(a) {
                if tri.v[next(k)] == b {
                    return Ok(Trace::Edge(t, prev(k)));
                }
                if tri.v[prev(k)] == b {
                    return Ok(Trace::Edge(t, next(k)));
                }
            }
        }

        for &t in &fan {
            let tri = self.tris[t];
            let k = match tri.corner(a) {
                Some(k) => k,
                None => continue,
            };
            let (x, y) = (tri.v[next(k)], tri.v[prev(k)]);
            let (px, py) = (self.pt(x), self.pt(y));
            if orient2d(pa, px, pb) < 0.0 || orient2d(pa, pb, py) < 0.0 {
                continue;
            }
            let ahead = |q: Point| (q.x - pa.x) * (pb.x - pa.x) + (q.y - pa.y) * (pb.y - pa.y) > 0.0;
            if orient2d(pa, pb, px) == 0.0 && ahead(px) {
                return Ok(Trace::Through(x));
            }
            if orient2d(pa, pb, py) == 0.0 && ahead(py) {
                return Ok(Trace::Through(y));
            }
            return self.walk_crossings(a, b, t, k);
        }
        Err(TriangulationError::Internal(format!(
            "no triangle around vertex {} faces vertex {}",
            a, b
        )))
    }

    /// Continue a trace from triangle `t`, whose edge `i` the segment crosses
    /// with corner `next(i)` on its right and `prev(i)` on its left.
    fn walk_crossings(&self, a: u32, b: u32, mut t: u32, mut i: usize) -> Result<Trace, TriangulationError> {
        let (pa, pb) = (self.pt(a), self.pt(b));
        let mut edges = Vec::new();
        for _ in 0..=self.tris.len() {
            let tri = self.tris[t];
            edges.push((tri.v[next(i)], tri.v[prev(i)]));
            if tri.s[i] != INVALID {
                return Ok(Trace::Blocked(t, i));
            }
            let u = tri.n[i];
            if u == INVALID {
                return Err(TriangulationError::Internal(format!(
                    "segment {}-{} leaves the mesh",
                    a, b
                )));
            }
            let j = self.slot_of(u, t)?;
            let d = self.tris[u].v[j];
            if d == b {
                return Ok(Trace::Crosses(edges));
            }
            let od = orient2d(pa, pb, self.pt(d));
            if od == 0.0 {
                return Ok(Trace::Through(d));
            }
            t = u;
            i = if od > 0.0 { next(j) } else { prev(j) };
        }
        Err(TriangulationError::Internal(format!(
            "trace of segment {}-{} does not terminate",
            a, b
        )))
    }

    /// Flip the crossed edges out of the way (Sloan), then restore the
    /// Delaunay property among the edges that were created.
    fn recover_by_flips(
        &mut self,
        a: u32,
        b: u32,
        marker: u32,
        origin: [u32; 2],
        crossed: Vec<(u32, u32)>,
    ) -> Result<(), TriangulationError> {
        let (pa, pb) = (self.pt(a), self.pt(b));
        let limit = 4 * (crossed.len() + 1) * (crossed.len() + 1) + 64;
        let mut queue: VecDeque<(u32, u32)> = crossed.into();
        let mut created: Vec<(u32, u32)> = Vec::new();
        let mut steps = 0;
        while let Some((x, y)) = queue.pop_front() {
            steps += 1;
            if steps > limit {
                return Err(TriangulationError::Internal(format!(
                    "flip recovery of segment {}-{} stalled",
                    a, b
                )));
            }
            let (t, i) = self.find_edge(x, y).ok_or_else(|| {
                TriangulationError::Internal(format!("crossed edge {}-{} vanished", x, y))
            })?;
            let u = self.tris[t].n[i];
            if u == INVALID {
                return Err(TriangulationError::Internal(format!(
                    "crossed edge {}-{} is on the hull",
                    x, y
                )));
            }
            let p = self.tris[t].v[i];
            let q = self.tris[u].v[self.slot_of(u, t)?];
            let (pp, pq) = (self.pt(p), self.pt(q));
            if !signs_differ(orient2d(pp, pq, self.pt(x)), orient2d(pp, pq, self.pt(y))) {
                // Not convex yet; another flip will fix that.
                queue.push_back((x, y));
                continue;
            }
            self.flip(t, i)?;
            if (p == a && q == b) || (p == b && q == a) {
                continue;
            }
            if crosses(pa, pb, pp, pq) {
                queue.push_back((p, q));
            } else {
                created.push((p, q));
            }
        }

        let (t, i) = self.find_edge(a, b).ok_or_else(|| {
            TriangulationError::Internal(format!("segment {}-{} missing after flips", a, b))
        })?;
        self.mark_subsegment(t, i, a, b, marker, origin);

        let mut changed = true;
        let mut rounds = 0;
        while changed && rounds < limit {
            changed = false;
            rounds += 1;
            for k in 0..created.len() {
                let (x, y) = created[k];
                let (t, i) = match self.find_edge(x, y) {
                    Some(e) => e,
                    None => continue,
                };
                let tri = self.tris[t];
                let u = tri.n[i];
                if tri.s[i] != INVALID || u == INVALID {
                    continue;
                }
                let d = self.tris[u].v[self.slot_of(u, t)?];
                let [p0, p1, p2] = tri.v.map(|v| self.pt(v));
                if incircle(p0, p1, p2, self.pt(d)) > 0.0 {
                    self.flip(t, i)?;
                    created[k] = (tri.v[i], d);
                    changed = true;
                }
            }
        }
        trace!("segment {}-{} recovered by flips", a, b);
        Ok(())
    }
}
