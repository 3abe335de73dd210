// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
// Shared test utilities for tilemesh tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilemesh::predicates::{incircle, orient2d};
use tilemesh::{IntPoint, Path, Point, TriangleMesh, Triangulation};

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Axis-aligned counter-clockwise square in fixed point.
pub fn square(x0: i64, y0: i64, size: i64) -> Path {
    vec![
        IntPoint::new(x0, y0),
        IntPoint::new(x0 + size, y0),
        IntPoint::new(x0 + size, y0 + size),
        IntPoint::new(x0, y0 + size),
    ]
}

pub fn float_square(x0: f64, y0: f64, size: f64) -> Vec<[f64; 2]> {
    vec![
        [x0, y0],
        [x0 + size, y0],
        [x0 + size, y0 + size],
        [x0, y0 + size],
    ]
}

pub fn points(raw: &[[f64; 2]]) -> Vec<Point> {
    raw.iter().map(|&p| Point::from(p)).collect()
}

/// Net signed area of a path set (holes subtract).
pub fn paths_area(paths: &[Path]) -> f64 {
    paths.iter().map(|p| tilemesh::geom::area(p)).sum()
}

/// Seeded random points inside `[0, size)^2`.
pub fn random_points(seed: u64, count: usize, size: f64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point::new(rng.random_range(0.0..size), rng.random_range(0.0..size)))
        .collect()
}

/// Every triangle is counter-clockwise and no vertex lies strictly inside
/// a circumcircle.
pub fn assert_delaunay(mesh: &Triangulation) {
    let verts = mesh.vertices();
    for (t, tri) in mesh.triangles() {
        let [a, b, c] = tri.v.map(|v| verts[v as usize].p);
        assert!(orient2d(a, b, c) > 0.0, "triangle {} is not counter-clockwise", t);
        for (i, v) in verts.iter().enumerate() {
            if tri.v.contains(&(i as u32)) {
                continue;
            }
            assert!(
                incircle(a, b, c, v.p) <= 0.0,
                "vertex {} ({}, {}) is inside the circumcircle of triangle {}",
                i,
                v.p.x,
                v.p.y,
                t
            );
        }
    }
}

/// Each neighbour link is returned by the neighbour.
pub fn assert_reciprocal(mesh: &Triangulation) {
    let tris: Vec<_> = mesh.triangles().map(|(t, tri)| (t, *tri)).collect();
    for &(t, tri) in &tris {
        for &u in &tri.n {
            if u == u32::MAX {
                continue;
            }
            let other = tris
                .iter()
                .find(|(id, _)| *id == u)
                .unwrap_or_else(|| panic!("triangle {} links to dead triangle {}", t, u));
            assert!(
                other.1.n.contains(&t),
                "triangle {} links to {} but not the other way round",
                t,
                u
            );
        }
    }
    mesh.check_consistency().unwrap();
}

pub fn triangle_points(mesh: &TriangleMesh, t: usize) -> [[f64; 2]; 3] {
    mesh.triangles[t].map(|i| mesh.vertices[i as usize])
}

/// Smallest interior angle of a mesh triangle, in degrees.
pub fn min_angle(p: [[f64; 2]; 3]) -> f64 {
    let mut best = 180.0f64;
    for i in 0..3 {
        let (a, b, c) = (p[i], p[(i + 1) % 3], p[(i + 2) % 3]);
        let u = [b[0] - a[0], b[1] - a[1]];
        let v = [c[0] - a[0], c[1] - a[1]];
        let cos = (u[0] * v[0] + u[1] * v[1])
            / ((u[0] * u[0] + u[1] * u[1]).sqrt() * (v[0] * v[0] + v[1] * v[1]).sqrt());
        best = best.min(cos.clamp(-1.0, 1.0).acos().to_degrees());
    }
    best
}

pub fn centroid(p: [[f64; 2]; 3]) -> [f64; 2] {
    [
        (p[0][0] + p[1][0] + p[2][0]) / 3.0,
        (p[0][1] + p[1][1] + p[2][1]) / 3.0,
    ]
}

/// True when `q` lies on segment a-b, within `eps`.
pub fn on_segment(a: [f64; 2], b: [f64; 2], q: [f64; 2], eps: f64) -> bool {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len = (dx * dx + dy * dy).sqrt();
    let cross = (q[0] - a[0]) * dy - (q[1] - a[1]) * dx;
    let t = ((q[0] - a[0]) * dx + (q[1] - a[1]) * dy) / (len * len);
    (cross / len).abs() <= eps && (-eps..=1.0 + eps).contains(&t)
}
