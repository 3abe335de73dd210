// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Ruppert refinement.
//
// Two queues drive the loop: encroached subsegments, always drained first,
// and bad triangles ordered by the squared cosine of their smallest angle
// (worst first). Queue entries carry the vertices they were made from and
// are dropped when the mesh has changed under them.

use std::collections::VecDeque;

use log::{debug, warn};

use super::{next, prev, ConstraintOptions, Triangulation, VertexKind};
use crate::error::TriangulationError;
use crate::mesh::INVALID;
use crate::predicates::{orient2d, Point};
use crate::priorityq::PriorityQ;

/// Extra refinement test: return true to have a triangle split.
pub type TrianglePredicate = fn(&[Point; 3], f64) -> bool;

/// Largest minimum angle refinement is known to reach in practice.
const MAX_SAFE_MIN_ANGLE: f64 = 33.8;

/// Quality bounds for refinement. Angles are in degrees.
///
/// ```
/// use tilemesh::QualityOptions;
///
/// let q = QualityOptions::default().with_min_angle(25.0).with_max_area(4.0);
/// assert_eq!(q.min_angle, 25.0);
/// assert_eq!(q.max_area, Some(4.0));
/// ```
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct QualityOptions {
    pub min_angle: f64,
    /// 180 disables the bound.
    pub max_angle: f64,
    pub max_area: Option<f64>,
    /// Cap on the total number of inserted vertices.
    pub steiner_budget: Option<usize>,
    /// Edges shorter than this are never split. Defaults to a millionth of
    /// the mesh extent.
    pub min_edge: Option<f64>,
    #[cfg_attr(feature = "serialization", serde(skip))]
    pub predicate: Option<TrianglePredicate>,
}

impl Default for QualityOptions {
    fn default() -> Self {
        QualityOptions {
            min_angle: 20.0,
            max_angle: 180.0,
            max_area: None,
            steiner_budget: None,
            min_edge: None,
            predicate: None,
        }
    }
}

impl QualityOptions {
    pub fn with_min_angle(mut self, degrees: f64) -> Self {
        self.min_angle = degrees;
        self
    }

    pub fn with_max_angle(mut self, degrees: f64) -> Self {
        self.max_angle = degrees;
        self
    }

    pub fn with_max_area(mut self, area: f64) -> Self {
        self.max_area = Some(area);
        self
    }

    pub fn with_steiner_budget(mut self, budget: usize) -> Self {
        self.steiner_budget = Some(budget);
        self
    }

    pub fn with_min_edge(mut self, length: f64) -> Self {
        self.min_edge = Some(length);
        self
    }

    pub fn with_predicate(mut self, predicate: TrianglePredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

/// Angle and area extremes over a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityStats {
    pub triangles: usize,
    pub min_angle: f64,
    pub max_angle: f64,
    pub min_area: f64,
    pub max_area: f64,
    pub total_area: f64,
}

#[derive(Clone, Copy, Debug)]
struct BadTriangle {
    key: f64,
    t: u32,
    v: [u32; 3],
}

fn worse_first(a: &BadTriangle, b: &BadTriangle) -> bool {
    a.key >= b.key
}

/// Thresholds derived from QualityOptions.
struct Bounds {
    cos2_min: f64,
    /// Cosine of the largest allowed angle; -1 when unbounded.
    cos_max: f64,
    max_area: f64,
    predicate: Option<TrianglePredicate>,
    /// Edges shorter than this are never split.
    tiny: f64,
}

fn dist2(a: Point, b: Point) -> f64 {
    (a.x - b.x) * (a.x - b.x) + (a.y - b.y) * (a.y - b.y)
}

/// Angles of a triangle in degrees, indexed by corner.
fn angles(p: [Point; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for i in 0..3 {
        let (a, b, c) = (p[i], p[next(i)], p[prev(i)]);
        let (ux, uy) = (b.x - a.x, b.y - a.y);
        let (vx, vy) = (c.x - a.x, c.y - a.y);
        out[i] = (ux * vy - uy * vx).abs().atan2(ux * vx + uy * vy).to_degrees();
    }
    out
}

fn circumcenter(a: Point, b: Point, c: Point) -> Option<Point> {
    let (bx, by) = (b.x - a.x, b.y - a.y);
    let (cx, cy) = (c.x - a.x, c.y - a.y);
    let d = 2.0 * (bx * cy - by * cx);
    if d == 0.0 {
        return None;
    }
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    Some(Point::new(
        a.x + (cy * b2 - by * c2) / d,
        a.y + (bx * c2 - cx * b2) / d,
    ))
}

/// Below this angle between two input segments, refinement leaves the
/// triangles spanning the corner alone.
const SHARP_CORNER: f64 = 60.0;

/// `p` lies strictly inside the circle with diameter x-y.
fn encroaches(p: Point, x: Point, y: Point) -> bool {
    (x.x - p.x) * (y.x - p.x) + (x.y - p.y) * (y.y - p.y) < 0.0
}

/// A subsegment waiting to be split. Forced requests come from a
/// circumcenter that was rejected because of the segment; the others are
/// re-checked for encroachment first.
#[derive(Clone, Copy, Debug)]
struct SplitRequest {
    sub: u32,
    v: [u32; 2],
    forced: bool,
}

enum Walk {
    Found(u32),
    Blocked(u32),
    Lost,
}

impl Triangulation {
    /// Smallest and largest angles and areas over the live triangles.
    pub fn quality_stats(&self) -> QualityStats {
        let mut s = QualityStats {
            triangles: 0,
            min_angle: 180.0,
            max_angle: 0.0,
            min_area: f64::INFINITY,
            max_area: 0.0,
            total_area: 0.0,
        };
        for (_, tri) in self.tris.iter() {
            let a = angles(tri.v.map(|v| self.pt(v)));
            s.triangles += 1;
            s.min_angle = a.iter().copied().fold(s.min_angle, f64::min);
            s.max_angle = a.iter().copied().fold(s.max_angle, f64::max);
            s.min_area = s.min_area.min(tri.area);
            s.max_area = s.max_area.max(tri.area);
            s.total_area += tri.area;
        }
        if s.triangles == 0 {
            s.min_area = 0.0;
        }
        s
    }

    /// Priority of triangle `t` when it violates a bound.
    fn badness(&self, t: u32, b: &Bounds) -> Option<f64> {
        let tri = &self.tris[t];
        let p = tri.v.map(|v| self.pt(v));
        let l = [0, 1, 2].map(|i| dist2(p[next(i)], p[prev(i)]));
        let short = (0..3).fold(0, |m, i| if l[i] < l[m] { i } else { m });
        let long = (0..3).fold(0, |m, i| if l[i] > l[m] { i } else { m });
        if l[short] <= b.tiny * b.tiny {
            return None;
        }

        let (la, lb) = (l[next(short)], l[prev(short)]);
        let c = la + lb - l[short];
        let cos2 = c * c / (4.0 * la * lb);

        let mut bad = false;
        // A sharp corner between two segments is part of the input.
        let input_corner = tri.s[next(short)] != INVALID && tri.s[prev(short)] != INVALID;
        if cos2 > b.cos2_min
            && !input_corner
            && !self.spans_sharp_corner(tri.v[next(short)], tri.v[prev(short)])
        {
            bad = true;
        }
        if b.cos_max > -1.0 {
            let (la, lb) = (l[next(long)], l[prev(long)]);
            let cos_big = (la + lb - l[long]) / (2.0 * (la * lb).sqrt());
            if cos_big < b.cos_max {
                bad = true;
            }
        }
        if tri.area > b.max_area {
            bad = true;
        }
        if let Some(pred) = b.predicate {
            if pred(&p, tri.area) {
                bad = true;
            }
        }
        bad.then_some(cos2)
    }

    /// Endpoints of the input segments vertex `v` lies on.
    fn segments_through(&self, v: u32) -> Vec<[u32; 2]> {
        let mut out: Vec<[u32; 2]> = Vec::new();
        for t in self.triangles_around(v) {
            let tri = &self.tris[t];
            let Some(k) = tri.corner(v) else { continue };
            for i in [next(k), prev(k)] {
                let s = tri.s[i];
                if s == INVALID {
                    continue;
                }
                let o = self.subsegs[s as usize].origin;
                if !out.iter().any(|e| *e == o || *e == [o[1], o[0]]) {
                    out.push(o);
                }
            }
        }
        out
    }

    /// `p` and `q` lie on two input segments meeting at a sharp angle.
    fn spans_sharp_corner(&self, p: u32, q: u32) -> bool {
        let on_p = self.segments_through(p);
        if on_p.is_empty() {
            return false;
        }
        let on_q = self.segments_through(q);
        for sa in &on_p {
            for sb in &on_q {
                if sa == sb || *sa == [sb[1], sb[0]] {
                    continue;
                }
                let Some(&apex) = sa.iter().find(|v| sb.contains(v)) else { continue };
                let ea = if sa[0] == apex { sa[1] } else { sa[0] };
                let eb = if sb[0] == apex { sb[1] } else { sb[0] };
                let (o, a, b) = (self.pt(apex), self.pt(ea), self.pt(eb));
                let (ux, uy, vx, vy) = (a.x - o.x, a.y - o.y, b.x - o.x, b.y - o.y);
                let angle = (ux * vy - uy * vx).abs().atan2(ux * vx + uy * vy).to_degrees();
                if angle < SHARP_CORNER {
                    return true;
                }
            }
        }
        false
    }

    fn queue_if_bad(&self, t: u32, b: &Bounds, queue: &mut PriorityQ<BadTriangle>) {
        if let Some(key) = self.badness(t, b) {
            queue.insert(BadTriangle {
                key,
                t,
                v: self.tris[t].v,
            });
        }
    }

    fn subsegment_encroached(&self, sub: u32) -> bool {
        let [x, y] = self.subsegs[sub as usize].v;
        let (px, py) = (self.pt(x), self.pt(y));
        let (t, i) = match self.find_edge(x, y) {
            Some(e) => e,
            None => return false,
        };
        let tri = &self.tris[t];
        if encroaches(self.pt(tri.v[i]), px, py) {
            return true;
        }
        let u = tri.n[i];
        if u == INVALID {
            return false;
        }
        self.tris[u]
            .n
            .iter()
            .position(|&w| w == t)
            .map_or(false, |j| encroaches(self.pt(self.tris[u].v[j]), px, py))
    }

    /// Queue every encroached subsegment on an edge of the given triangles.
    fn queue_encroached(&self, tris: &[u32], segs: &mut VecDeque<SplitRequest>) {
        for &t in tris {
            let Some(tri) = self.tris.get(t) else { continue };
            for sub in tri.s {
                if sub != INVALID && self.subsegment_encroached(sub) {
                    segs.push_back(self.split_request(sub, false));
                }
            }
        }
    }

    fn split_request(&self, sub: u32, forced: bool) -> SplitRequest {
        SplitRequest {
            sub,
            v: self.subsegs[sub as usize].v,
            forced,
        }
    }

    fn long_enough(&self, sub: u32, b: &Bounds) -> bool {
        let [x, y] = self.subsegs[sub as usize].v;
        dist2(self.pt(x), self.pt(y)) > 4.0 * b.tiny * b.tiny
    }

    /// Straight walk from the centroid of `t` towards `c`.
    fn walk_toward(&self, t: u32, c: Point) -> Walk {
        let p = self.tris[t].v.map(|v| self.pt(v));
        let from = Point::new((p[0].x + p[1].x + p[2].x) / 3.0, (p[0].y + p[1].y + p[2].y) / 3.0);
        let mut cur = t;
        let mut came_from = INVALID;
        for _ in 0..=self.tris.len() {
            let tri = self.tris[cur];
            let mut exit = None;
            for i in 0..3 {
                if tri.n[i] == came_from && came_from != INVALID {
                    continue;
                }
                let (x, y) = (self.pt(tri.v[next(i)]), self.pt(tri.v[prev(i)]));
                if orient2d(x, y, c) < 0.0 {
                    let (ox, oy) = (orient2d(from, c, x), orient2d(from, c, y));
                    if (ox >= 0.0 && oy <= 0.0) || (ox <= 0.0 && oy >= 0.0) {
                        exit = Some(i);
                        break;
                    }
                }
            }
            let i = match exit {
                Some(i) => i,
                None => {
                    let inside = (0..3).all(|i| {
                        orient2d(self.pt(tri.v[next(i)]), self.pt(tri.v[prev(i)]), c) >= 0.0
                    });
                    return if inside { Walk::Found(cur) } else { Walk::Lost };
                }
            };
            if tri.s[i] != INVALID {
                return Walk::Blocked(tri.s[i]);
            }
            if tri.n[i] == INVALID {
                return Walk::Lost;
            }
            came_from = cur;
            cur = tri.n[i];
        }
        Walk::Lost
    }

    /// Split subsegment `sub` at its midpoint. Returns the new vertex.
    fn split_subsegment(&mut self, sub: u32) -> Result<Option<u32>, TriangulationError> {
        let seg = self.subsegs[sub as usize];
        let [x, y] = seg.v;
        let (t, i) = match self.find_edge(x, y) {
            Some(e) => e,
            None => return Ok(None),
        };
        let (px, py) = (self.pt(x), self.pt(y));
        let mid = Point::new(0.5 * (px.x + py.x), 0.5 * (px.y + py.y));
        let v = self.add_vertex(mid, VertexKind::Boundary, seg.marker);
        let fresh = self.split_edge(t, i, v)?;
        self.legalize(v, &fresh)?;
        Ok(Some(v))
    }

    /// Ruppert refinement until no triangle is bad or the budget is spent.
    pub(crate) fn refine(
        &mut self,
        opts: &QualityOptions,
        constraints: &ConstraintOptions,
    ) -> Result<(), TriangulationError> {
        let mut min_angle = opts.min_angle.clamp(0.0, 60.0);
        if min_angle > MAX_SAFE_MIN_ANGLE && opts.steiner_budget.is_none() {
            warn!(
                "minimum angle {} may not terminate without a Steiner budget; using {}",
                min_angle, MAX_SAFE_MIN_ANGLE
            );
            min_angle = MAX_SAFE_MIN_ANGLE;
        }
        let diag = match self.verts.first() {
            Some(first) => {
                let (lo, hi) = self.verts.iter().fold((first.p, first.p), |(lo, hi), v| {
                    (
                        Point::new(lo.x.min(v.p.x), lo.y.min(v.p.y)),
                        Point::new(hi.x.max(v.p.x), hi.y.max(v.p.y)),
                    )
                });
                dist2(lo, hi).sqrt()
            }
            None => return Ok(()),
        };
        let cos_min = min_angle.to_radians().cos();
        let bounds = Bounds {
            cos2_min: cos_min * cos_min,
            cos_max: if opts.max_angle < 180.0 {
                opts.max_angle.to_radians().cos()
            } else {
                -1.0
            },
            max_area: opts.max_area.unwrap_or(f64::INFINITY),
            predicate: opts.predicate,
            tiny: opts.min_edge.unwrap_or(diag * 1e-6),
        };
        let budget = opts.steiner_budget.unwrap_or(usize::MAX);
        let start = self.steiner;

        let mut segs: VecDeque<SplitRequest> = VecDeque::new();
        let mut bad = PriorityQ::new(worse_first);
        bad.init();
        let all = self.tris.indices();
        if constraints.split_segments {
            self.queue_encroached(&all, &mut segs);
        }
        for &t in &all {
            self.queue_if_bad(t, &bounds, &mut bad);
        }

        let mut exhausted = false;
        loop {
            if self.steiner >= budget {
                exhausted = !segs.is_empty() || !bad.is_empty();
                break;
            }
            if let Some(req) = segs.pop_front() {
                let sub = req.sub;
                if self.subsegs[sub as usize].v != req.v
                    || !self.long_enough(sub, &bounds)
                    || !(req.forced || self.subsegment_encroached(sub))
                {
                    continue;
                }
                if let Some(v) = self.split_subsegment(sub)? {
                    let around = self.triangles_around(v);
                    self.queue_encroached(&around, &mut segs);
                    for &t in &around {
                        self.queue_if_bad(t, &bounds, &mut bad);
                    }
                }
                continue;
            }

            let Some(entry) = bad.extract_min() else { break };
            match self.tris.get(entry.t) {
                Some(tri) if tri.v == entry.v => {}
                _ => continue,
            }
            if self.badness(entry.t, &bounds).is_none() {
                continue;
            }
            let [a, b, c] = entry.v.map(|v| self.pt(v));
            let Some(center) = circumcenter(a, b, c) else { continue };

            let found = match self.walk_toward(entry.t, center) {
                Walk::Found(u) => u,
                Walk::Blocked(sub) => {
                    if constraints.split_segments && self.long_enough(sub, &bounds) {
                        segs.push_back(self.split_request(sub, true));
                        bad.insert(entry);
                    }
                    continue;
                }
                Walk::Lost => continue,
            };
            let Some((cavity, rim)) = self.cavity(center, found) else { continue };

            let encroached: Vec<u32> = rim
                .iter()
                .filter(|e| e.sub != INVALID && encroaches(center, self.pt(e.x), self.pt(e.y)))
                .map(|e| e.sub)
                .collect();
            if !encroached.is_empty() {
                // The triangle is only retried when some segment can still be split.
                let splittable: Vec<u32> = encroached
                    .into_iter()
                    .filter(|&sub| self.long_enough(sub, &bounds))
                    .collect();
                if constraints.split_segments && !splittable.is_empty() {
                    for sub in splittable {
                        segs.push_back(self.split_request(sub, true));
                    }
                    bad.insert(entry);
                }
                continue;
            }

            let v = self.add_vertex(center, VertexKind::Steiner, 0);
            let fresh = self.fill_cavity(v, &cavity, &rim)?;
            if constraints.split_segments {
                self.queue_encroached(&fresh, &mut segs);
            }
            for &t in &fresh {
                self.queue_if_bad(t, &bounds, &mut bad);
            }
        }

        if exhausted {
            warn!(
                "Steiner budget of {} reached with bad triangles left",
                budget
            );
        }
        debug!(
            "refinement: {} vertices inserted, {} triangles",
            self.steiner - start,
            self.tris.len()
        );
        Ok(())
    }
}
