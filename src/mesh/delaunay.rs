// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Divide-and-conquer Delaunay triangulation (Guibas & Stolfi) on the half-edge mesh.

use super::{sym, EdgeIdx, Mesh, VertIdx, INVALID};
use crate::predicates::{incircle, orient2d, Point};

/// One triangle of the extracted mesh. Edge `i` joins `v[(i+1)%3]` and
/// `v[(i+2)%3]`; `n[i]` is the face across it, INVALID on the hull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRecord {
    pub v: [VertIdx; 3],
    pub n: [u32; 3],
}

impl Mesh {
    #[inline]
    fn pt(points: &[Point], v: VertIdx) -> Point {
        points[v as usize]
    }

    fn left_of(&self, points: &[Point], x: VertIdx, e: EdgeIdx) -> bool {
        orient2d(
            Self::pt(points, x),
            Self::pt(points, self.org(e)),
            Self::pt(points, self.dst(e)),
        ) > 0.0
    }

    fn right_of(&self, points: &[Point], x: VertIdx, e: EdgeIdx) -> bool {
        orient2d(
            Self::pt(points, x),
            Self::pt(points, self.dst(e)),
            Self::pt(points, self.org(e)),
        ) > 0.0
    }

    /// Triangulate `order`, a slice of vertex ids sorted by x then y with
    /// no duplicate positions. Returns the counter-clockwise convex hull
    /// edge leaving the leftmost vertex.
    pub fn delaunay(&mut self, points: &[Point], order: &[VertIdx]) -> EdgeIdx {
        self.clear();
        if order.len() < 2 {
            return INVALID;
        }
        let (le, _) = self.divide(points, order);
        le
    }

    /// Returns (ldo, rdo): the CCW hull edge out of the leftmost vertex and
    /// the CW hull edge out of the rightmost vertex.
    fn divide(&mut self, points: &[Point], s: &[VertIdx]) -> (EdgeIdx, EdgeIdx) {
        match s.len() {
            2 => {
                let a = self.make_edge(s[0], s[1]);
                (a, sym(a))
            }
            3 => {
                let a = self.make_edge(s[0], s[1]);
                let b = self.make_edge(s[1], s[2]);
                self.splice(sym(a), b);
                let o = orient2d(
                    Self::pt(points, s[0]),
                    Self::pt(points, s[1]),
                    Self::pt(points, s[2]),
                );
                if o > 0.0 {
                    self.connect(b, a);
                    (a, sym(b))
                } else if o < 0.0 {
                    let c = self.connect(b, a);
                    (sym(c), c)
                } else {
                    // Collinear: leave the chain open.
                    (a, sym(b))
                }
            }
            n => {
                let (l, r) = s.split_at(n / 2);
                let (mut ldo, mut ldi) = self.divide(points, l);
                let (mut rdi, mut rdo) = self.divide(points, r);
                self.merge(points, &mut ldo, &mut ldi, &mut rdi, &mut rdo);
                (ldo, rdo)
            }
        }
    }

    fn merge(
        &mut self,
        points: &[Point],
        ldo: &mut EdgeIdx,
        ldi: &mut EdgeIdx,
        rdi: &mut EdgeIdx,
        rdo: &mut EdgeIdx,
    ) {
        // Lower common tangent.
        loop {
            if self.left_of(points, self.org(*rdi), *ldi) {
                *ldi = self.lnext(*ldi);
            } else if self.right_of(points, self.org(*ldi), *rdi) {
                *rdi = self.rprev(*rdi);
            } else {
                break;
            }
        }

        let mut basel = self.connect(sym(*rdi), *ldi);
        if self.org(*ldi) == self.org(*ldo) {
            *ldo = sym(basel);
        }
        if self.org(*rdi) == self.org(*rdo) {
            *rdo = basel;
        }

        // Zip the two halves together from the bottom up.
        loop {
            let valid = |m: &Mesh, e: EdgeIdx, basel: EdgeIdx| m.right_of(points, m.dst(e), basel);

            let mut lcand = self.onext(sym(basel));
            if valid(self, lcand, basel) {
                while self.in_circle(points, basel, self.dst(lcand), self.dst(self.onext(lcand))) {
                    let t = self.onext(lcand);
                    self.delete_edge(lcand);
                    lcand = t;
                }
            }
            let mut rcand = self.oprev(basel);
            if valid(self, rcand, basel) {
                while self.in_circle(points, basel, self.dst(rcand), self.dst(self.oprev(rcand))) {
                    let t = self.oprev(rcand);
                    self.delete_edge(rcand);
                    rcand = t;
                }
            }

            let l_ok = valid(self, lcand, basel);
            let r_ok = valid(self, rcand, basel);
            if !l_ok && !r_ok {
                break;
            }
            let pick_right = !l_ok
                || (r_ok
                    && incircle(
                        Self::pt(points, self.dst(lcand)),
                        Self::pt(points, self.org(lcand)),
                        Self::pt(points, self.org(rcand)),
                        Self::pt(points, self.dst(rcand)),
                    ) > 0.0);
            basel = if pick_right {
                self.connect(rcand, sym(basel))
            } else {
                self.connect(sym(basel), sym(lcand))
            };
        }
    }

    /// True when `d` lies strictly inside the circle through dst(basel),
    /// org(basel) and `c`.
    fn in_circle(&self, points: &[Point], basel: EdgeIdx, c: VertIdx, d: VertIdx) -> bool {
        incircle(
            Self::pt(points, self.dst(basel)),
            Self::pt(points, self.org(basel)),
            Self::pt(points, c),
            Self::pt(points, d),
        ) > 0.0
    }

    /// Collect every counter-clockwise triangular face with its neighbours.
    pub fn faces(&mut self, points: &[Point]) -> Vec<FaceRecord> {
        for h in self.edges.iter_mut() {
            h.mark = false;
        }
        // Face owning each half-edge, and the local edge index it plays there.
        let mut owner: Vec<(u32, u8)> = vec![(INVALID, 0); self.edges.len()];
        let mut faces: Vec<FaceRecord> = Vec::new();
        let mut face_edges: Vec<[EdgeIdx; 3]> = Vec::new();

        for i in 0..self.edges.len() {
            let e0 = i as EdgeIdx;
            if !self.is_live(e0) || self.edges[i].mark {
                continue;
            }
            let e1 = self.lnext(e0);
            let e2 = self.lnext(e1);
            for e in [e0, e1, e2] {
                self.edges[e as usize].mark = true;
            }
            if self.lnext(e2) != e0 {
                continue;
            }
            let v = [self.org(e0), self.org(e1), self.org(e2)];
            if orient2d(
                Self::pt(points, v[0]),
                Self::pt(points, v[1]),
                Self::pt(points, v[2]),
            ) <= 0.0
            {
                // The outer face of a triangular hull.
                continue;
            }
            let f = faces.len() as u32;
            // e0 runs v0 -> v1, opposite v2.
            let by_index = [e1, e2, e0];
            for (k, &e) in by_index.iter().enumerate() {
                owner[e as usize] = (f, k as u8);
            }
            faces.push(FaceRecord {
                v,
                n: [INVALID; 3],
            });
            face_edges.push(by_index);
        }

        for (f, edges) in face_edges.iter().enumerate() {
            for k in 0..3 {
                faces[f].n[k] = owner[sym(edges[k]) as usize].0;
            }
        }
        faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn sorted(points: &[Point]) -> Vec<VertIdx> {
        let mut order: Vec<VertIdx> = (0..points.len() as u32).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (points[a as usize], points[b as usize]);
            pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
        });
        order
    }

    #[test]
    fn square_gives_two_triangles() {
        let p = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let mut mesh = Mesh::new();
        mesh.delaunay(&p, &sorted(&p));
        assert!(mesh.check().is_ok());
        let faces = mesh.faces(&p);
        assert_eq!(faces.len(), 2);
        assert_eq!(mesh.edge_count(), 5);
        let shared: usize = faces
            .iter()
            .map(|f| f.n.iter().filter(|&&n| n != INVALID).count())
            .sum();
        assert_eq!(shared, 2);
    }

    #[test]
    fn collinear_points_make_no_faces() {
        let p = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        let mut mesh = Mesh::new();
        mesh.delaunay(&p, &sorted(&p));
        assert!(mesh.check().is_ok());
        assert!(mesh.faces(&p).is_empty());
        assert_eq!(mesh.edge_count(), 4);
    }

    #[test]
    fn grid_satisfies_euler() {
        let mut raw = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                raw.push((i as f64 + 0.01 * j as f64, j as f64 + 0.013 * i as f64));
            }
        }
        let p = pts(&raw);
        let mut mesh = Mesh::new();
        mesh.delaunay(&p, &sorted(&p));
        assert!(mesh.check().is_ok());
        let faces = mesh.faces(&p);
        // V - E + F = 2, counting the outer face.
        let v = p.len() as i64;
        let e = mesh.edge_count() as i64;
        let f = faces.len() as i64 + 1;
        assert_eq!(v - e + f, 2);
        for (i, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let n = face.n[k];
                if n != INVALID {
                    assert!(faces[n as usize].n.contains(&(i as u32)));
                }
            }
        }
    }
}
