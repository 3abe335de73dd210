// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Vertex insertion: 1->3 and 2->4 splits with Lawson flips, edge flips, and
// Bowyer-Watson cavity filling for refinement.

use super::{next, prev, Location, Subsegment, Triangle, Triangulation, VertexKind};
use crate::error::TriangulationError;
use crate::mesh::INVALID;
use crate::predicates::{incircle, orient2d, Point};

/// Outcome of inserting a point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Inserted {
    New(u32),
    Existing(u32),
    Outside,
}

/// An edge on the rim of a cavity, in the removed triangle's orientation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RimEdge {
    pub x: u32,
    pub y: u32,
    pub outer: u32,
    pub sub: u32,
}

impl Triangulation {
    /// Insert `p` and restore the Delaunay property around it. Subsegments
    /// are never flipped; a point landing on one splits it.
    pub(crate) fn insert_point(
        &mut self,
        p: Point,
        kind: VertexKind,
        marker: u32,
        hint: u32,
    ) -> Result<Inserted, TriangulationError> {
        match self.locate(p, hint) {
            Location::Outside => Ok(Inserted::Outside),
            Location::OnVertex(_, v) => Ok(Inserted::Existing(v)),
            Location::Inside(t) => {
                let v = self.add_vertex(p, kind, marker);
                let fresh = self.split_triangle(t, v);
                self.legalize(v, &fresh)?;
                Ok(Inserted::New(v))
            }
            Location::OnEdge(t, i) => {
                let sub = self.tris[t].s[i];
                let (kind, marker) = if sub != INVALID {
                    (VertexKind::Boundary, self.subsegs[sub as usize].marker)
                } else {
                    (kind, marker)
                };
                let v = self.add_vertex(p, kind, marker);
                let fresh = self.split_edge(t, i, v)?;
                self.legalize(v, &fresh)?;
                Ok(Inserted::New(v))
            }
        }
    }

    /// Replace `t` by three triangles fanned around `p`. In each new
    /// triangle `p` is corner 2.
    pub(crate) fn split_triangle(&mut self, t: u32, p: u32) -> [u32; 3] {
        let old = self.tris[t];
        let ids = [
            t,
            self.tris.insert(Triangle::default()),
            self.tris.insert(Triangle::default()),
        ];
        for k in 0..3 {
            self.set_tri(
                ids[k],
                [old.v[next(k)], old.v[prev(k)], p],
                [ids[next(k)], ids[prev(k)], old.n[k]],
                [INVALID, INVALID, old.s[k]],
            );
            if k != 0 {
                self.replace_neighbor(old.n[k], t, ids[k]);
            }
        }
        ids
    }

    /// Cut subsegment `sub`, which runs between `x` and `y`, at `p`.
    /// Returns the pieces covering x-p and p-y.
    fn cut_subsegment(&mut self, sub: u32, x: u32, y: u32, p: u32) -> (u32, u32) {
        let seg = self.subsegs[sub as usize];
        let piece = self.subsegs.len() as u32;
        if seg.v[0] == x {
            self.subsegs[sub as usize].v = [x, p];
            self.subsegs.push(Subsegment { v: [p, y], ..seg });
            (sub, piece)
        } else {
            self.subsegs[sub as usize].v = [y, p];
            self.subsegs.push(Subsegment { v: [p, x], ..seg });
            (piece, sub)
        }
    }

    /// Split edge `i` of `t`, and the triangle across it, at vertex `p`,
    /// which must lie on that edge. In each new triangle `p` is corner 2.
    pub(crate) fn split_edge(&mut self, t: u32, i: usize, p: u32) -> Result<Vec<u32>, TriangulationError> {
        let tt = self.tris[t];
        let u = tt.n[i];
        let a = tt.v[i];
        let x = tt.v[next(i)];
        let y = tt.v[prev(i)];
        let (sub_x, sub_y) = if tt.s[i] != INVALID {
            self.cut_subsegment(tt.s[i], x, y, p)
        } else {
            (INVALID, INVALID)
        };

        let b = self.tris.insert(Triangle::default());
        let (far, far2, uu, j) = if u != INVALID {
            let j = self.slot_of(u, t)?;
            (u, self.tris.insert(Triangle::default()), self.tris[u], j)
        } else {
            (INVALID, INVALID, Triangle::default(), 0)
        };

        // t side: A = (a, x, p) reuses t, B = (y, a, p).
        self.set_tri(
            t,
            [a, x, p],
            [far2, b, tt.n[prev(i)]],
            [sub_x, INVALID, tt.s[prev(i)]],
        );
        self.set_tri(
            b,
            [y, a, p],
            [t, far, tt.n[next(i)]],
            [INVALID, sub_y, tt.s[next(i)]],
        );
        self.replace_neighbor(tt.n[next(i)], t, b);

        if u == INVALID {
            return Ok(vec![t, b]);
        }
        // u side: A' = (d, y, p) reuses u, B' = (x, d, p).
        let d = uu.v[j];
        self.set_tri(
            u,
            [d, y, p],
            [b, far2, uu.n[prev(j)]],
            [sub_y, INVALID, uu.s[prev(j)]],
        );
        self.set_tri(
            far2,
            [x, d, p],
            [u, t, uu.n[next(j)]],
            [INVALID, sub_x, uu.s[next(j)]],
        );
        self.replace_neighbor(uu.n[next(j)], u, far2);
        Ok(vec![t, b, u, far2])
    }

    /// Flip the edge opposite corner `i` of `t`.
    ///
    /// t = (a, b, c) and its neighbour u = (d, c, b) become
    /// t = (a, b, d) and u = (d, c, a).
    pub(crate) fn flip(&mut self, t: u32, i: usize) -> Result<u32, TriangulationError> {
        let tt = self.tris[t];
        let u = tt.n[i];
        let j = self.slot_of(u, t)?;
        let uu = self.tris[u];
        let (a, b, c, d) = (tt.v[i], tt.v[next(i)], tt.v[prev(i)], uu.v[j]);

        let (mb, sb) = (tt.n[next(i)], tt.s[next(i)]);
        let (mc, sc) = (tt.n[prev(i)], tt.s[prev(i)]);
        let (kc, skc) = (uu.n[next(j)], uu.s[next(j)]);
        let (kb, skb) = (uu.n[prev(j)], uu.s[prev(j)]);

        self.set_tri(t, [a, b, d], [kc, u, mc], [skc, INVALID, sc]);
        self.set_tri(u, [d, c, a], [mb, t, kb], [sb, INVALID, skb]);
        self.replace_neighbor(kc, u, t);
        self.replace_neighbor(mb, t, u);
        Ok(u)
    }

    /// Lawson flips outward from `p` until every edge opposite it is
    /// locally Delaunay or constrained.
    pub(crate) fn legalize(&mut self, p: u32, fresh: &[u32]) -> Result<(), TriangulationError> {
        let mut stack: Vec<(u32, usize)> = fresh
            .iter()
            .filter_map(|&t| self.tris[t].corner(p).map(|k| (t, k)))
            .collect();
        while let Some((t, i)) = stack.pop() {
            let tt = match self.tris.get(t) {
                Some(tt) if tt.v[i] == p => *tt,
                _ => continue,
            };
            let u = tt.n[i];
            if tt.s[i] != INVALID || u == INVALID {
                continue;
            }
            let j = self.slot_of(u, t)?;
            let d = self.tris[u].v[j];
            let [a, b, c] = tt.v.map(|v| self.pt(v));
            if incircle(a, b, c, self.pt(d)) > 0.0 {
                // p ends up as corner 0 of t and corner 2 of u.
                let u = self.flip(t, i)?;
                stack.push((t, 0));
                stack.push((u, 2));
            }
        }
        Ok(())
    }

    /// Triangles whose circumcircle strictly contains `p`, grown from `start`
    /// without crossing subsegments, and the rim around them. None when the
    /// cavity is not star-shaped from `p`.
    pub(crate) fn cavity(&self, p: Point, start: u32) -> Option<(Vec<u32>, Vec<RimEdge>)> {
        let mut cavity = vec![start];
        let mut k = 0;
        while k < cavity.len() {
            let tri = self.tris[cavity[k]];
            for i in 0..3 {
                let u = tri.n[i];
                if u == INVALID || tri.s[i] != INVALID || cavity.contains(&u) {
                    continue;
                }
                let [a, b, c] = self.tris[u].v.map(|v| self.pt(v));
                if incircle(a, b, c, p) > 0.0 {
                    cavity.push(u);
                }
            }
            k += 1;
        }

        let mut rim = Vec::new();
        for &t in &cavity {
            let tri = self.tris[t];
            for i in 0..3 {
                let u = tri.n[i];
                if u != INVALID && cavity.contains(&u) {
                    continue;
                }
                let (x, y) = (tri.v[next(i)], tri.v[prev(i)]);
                if orient2d(self.pt(x), self.pt(y), p) <= 0.0 {
                    return None;
                }
                rim.push(RimEdge {
                    x,
                    y,
                    outer: u,
                    sub: tri.s[i],
                });
            }
        }
        // Every cavity vertex must stay on the rim.
        for &t in &cavity {
            for v in self.tris[t].v {
                if !rim.iter().any(|e| e.x == v) {
                    return None;
                }
            }
        }
        Some((cavity, rim))
    }

    /// Replace the cavity by a fan of triangles around vertex `v`.
    pub(crate) fn fill_cavity(
        &mut self,
        v: u32,
        cavity: &[u32],
        rim: &[RimEdge],
    ) -> Result<Vec<u32>, TriangulationError> {
        for &t in cavity {
            self.tris.free(t);
        }
        let ids: Vec<u32> = rim
            .iter()
            .map(|_| self.tris.insert(Triangle::default()))
            .collect();
        for (k, e) in rim.iter().enumerate() {
            let after = rim.iter().position(|f| f.x == e.y);
            let before = rim.iter().position(|f| f.y == e.x);
            let (after, before) = match (after, before) {
                (Some(a), Some(b)) => (ids[a], ids[b]),
                _ => {
                    return Err(TriangulationError::Internal(format!(
                        "cavity rim around vertex {} is not a closed loop",
                        v
                    )))
                }
            };
            self.set_tri(ids[k], [e.x, e.y, v], [after, before, e.outer], [INVALID, INVALID, e.sub]);
            self.relink(e.outer, e.y, e.x, ids[k]);
        }
        Ok(ids)
    }
}
