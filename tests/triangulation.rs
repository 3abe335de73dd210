// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
// Delaunay and constrained triangulation through the public API.

mod helpers;

use approx::assert_relative_eq;
use helpers::{assert_delaunay, assert_reciprocal, centroid, float_square, on_segment, points, triangle_points};
use tilemesh::clip::difference;
use tilemesh::geom::{area, path_to_float};
use tilemesh::polygon::contains;
use tilemesh::{
    CarveRule, ConstraintOptions, FillRule, IntPoint, Point, Polygon, TriangulationError, Triangulator,
};

fn ring_polygon() -> Polygon {
    let mut polygon = Polygon::new();
    polygon.add_contour(&points(&float_square(0.0, 0.0, 10.0)), false, 1);
    polygon.add_contour(&points(&float_square(3.0, 3.0, 4.0)), true, 2);
    polygon
}

#[test]
fn random_points_are_delaunay() {
    helpers::init_logging();
    let mut tri = Triangulator::new();
    for seed in 0..5 {
        let pts = helpers::random_points(seed, 300, 100.0);
        let mesh = tri.triangulate(&pts).unwrap();
        assert_delaunay(&mesh);
        assert_reciprocal(&mesh);
        let n = mesh.vertex_count();
        assert!(mesh.triangle_count() >= n - 2 && mesh.triangle_count() <= 2 * n - 5);
        tri.recycle(mesh);
    }
}

#[test]
fn grid_points_with_cocircular_quads() {
    let mut raw = Vec::new();
    for y in 0..6 {
        for x in 0..6 {
            raw.push([x as f64, y as f64]);
        }
    }
    let mut tri = Triangulator::new();
    let mesh = tri.triangulate(&points(&raw)).unwrap();
    assert_eq!(mesh.triangle_count(), 50);
    assert_delaunay(&mesh);
    assert_relative_eq!(mesh.to_mesh().area(), 25.0, epsilon = 1e-12);
}

#[test]
fn degenerate_inputs_are_rejected() {
    let mut tri = Triangulator::new();
    let line = points(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]);
    assert!(matches!(tri.triangulate(&line), Err(TriangulationError::TooFewPoints(_))));
    let two = points(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
    assert_eq!(tri.triangulate(&two).unwrap_err(), TriangulationError::TooFewPoints(2));
}

#[test]
fn ring_polygon_has_area_84_and_an_empty_hole() {
    let mut tri = Triangulator::new();
    let mesh = tri
        .triangulate_polygon(&ring_polygon(), &ConstraintOptions::default(), None)
        .unwrap();
    assert_reciprocal(&mesh);
    let flat = mesh.to_mesh();
    assert_relative_eq!(flat.area(), 84.0, epsilon = 1e-9);
    let hole = points(&float_square(3.0, 3.0, 4.0));
    for t in 0..flat.triangles.len() {
        let c = centroid(triangle_points(&flat, t));
        assert!(!contains(&hole, Point::from(c)), "triangle {} is inside the hole", t);
    }
}

#[test]
fn clipped_ring_triangulates_to_the_same_area() {
    let outer = vec![
        IntPoint::new(0, 0),
        IntPoint::new(10, 0),
        IntPoint::new(10, 10),
        IntPoint::new(0, 10),
    ];
    let hole = vec![
        IntPoint::new(3, 3),
        IntPoint::new(7, 3),
        IntPoint::new(7, 7),
        IntPoint::new(3, 7),
    ];
    let rings = difference(&[outer], &[hole], FillRule::NonZero).unwrap();
    let mut polygon = Polygon::new();
    for ring in &rings {
        let pts: Vec<Point> = path_to_float(ring, 1.0).into_iter().map(Point::from).collect();
        assert!(polygon.add_contour(&pts, area(ring) < 0.0, 1));
    }
    let mut tri = Triangulator::new();
    let mesh = tri
        .triangulate_polygon(&polygon, &ConstraintOptions::default(), None)
        .unwrap();
    assert_relative_eq!(mesh.to_mesh().area(), 84.0, epsilon = 1e-9);
}

#[test]
fn comb_segments_survive() {
    // A comb: deep notches force segments that the plain Delaunay mesh lacks.
    let outline = [
        [0.0, 0.0],
        [10.0, 0.0],
        [10.0, 6.0],
        [9.0, 6.0],
        [8.5, 0.5],
        [8.0, 6.0],
        [6.0, 6.0],
        [5.5, 0.5],
        [5.0, 6.0],
        [3.0, 6.0],
        [2.5, 0.5],
        [2.0, 6.0],
        [0.0, 6.0],
    ];
    let mut polygon = Polygon::new();
    polygon.add_contour(&points(&outline), false, 7);
    for conforming in [false, true] {
        let opts = ConstraintOptions::default().with_conforming_delaunay(conforming);
        let mut tri = Triangulator::new();
        let mesh = tri.triangulate_polygon(&polygon, &opts, None).unwrap();
        assert_reciprocal(&mesh);
        let flat = mesh.to_mesh();
        assert_relative_eq!(
            flat.area(),
            tilemesh::polygon::ring_area(&points(&outline)),
            epsilon = 1e-9
        );
        // Every input edge is covered by mesh segments lying on it.
        for i in 0..outline.len() {
            let (a, b) = (outline[i], outline[(i + 1) % outline.len()]);
            let covered: f64 = flat
                .segments
                .iter()
                .map(|s| (flat.vertices[s[0] as usize], flat.vertices[s[1] as usize]))
                .filter(|(p, q)| on_segment(a, b, *p, 1e-9) && on_segment(a, b, *q, 1e-9))
                .map(|(p, q)| ((q[0] - p[0]).powi(2) + (q[1] - p[1]).powi(2)).sqrt())
                .sum();
            let len = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
            assert_relative_eq!(covered, len, epsilon = 1e-9);
        }
    }
}

#[test]
fn segments_must_not_cross() {
    let mut polygon = Polygon::new();
    for p in [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]] {
        polygon.add_point(Point::from(p));
    }
    polygon.add_segment(0, 2, 0);
    polygon.add_segment(1, 3, 0);
    let mut tri = Triangulator::new();
    let refuse = ConstraintOptions::default().with_split_crossings(false);
    let err = tri.triangulate_polygon(&polygon, &refuse, None).unwrap_err();
    assert!(matches!(err, TriangulationError::CrossingSegments { .. }));
    assert!(!err.is_internal());
}

#[test]
fn self_crossing_ring_meshes_by_parity() {
    // A bow tie: the ring crosses itself once in the middle.
    let mut polygon = Polygon::new();
    let ring: Vec<Point> = [[0.0, 0.0], [4.0, 4.0], [4.0, 0.0], [0.0, 4.0]]
        .into_iter()
        .map(Point::from)
        .collect();
    assert!(polygon.add_contour(&ring, false, 1));
    let opts = ConstraintOptions::default().with_carve_rule(CarveRule::EvenOdd);
    let mut tri = Triangulator::new();
    let mesh = tri.triangulate_polygon(&polygon, &opts, None).unwrap();
    mesh.check_consistency().unwrap();
    let flat = mesh.to_mesh();
    assert_relative_eq!(flat.area(), 8.0, epsilon = 1e-9);
    assert_eq!(flat.vertices.len(), 5);
}

#[test]
fn reused_engine_gives_identical_meshes() {
    let mut tri = Triangulator::new();
    let first = tri
        .triangulate_polygon(&ring_polygon(), &ConstraintOptions::default(), None)
        .unwrap();
    let a = first.to_mesh();
    tri.recycle(first);
    let second = tri
        .triangulate_polygon(&ring_polygon(), &ConstraintOptions::default(), None)
        .unwrap();
    assert_eq!(a, second.to_mesh());
}
