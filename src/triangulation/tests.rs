// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Unit tests for the triangle arena and its operations.

use super::*;
use crate::predicates::incircle;

fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
    raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn square_with_hole() -> Polygon {
    let mut poly = Polygon::new();
    poly.add_contour(
        &pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
        false,
        1,
    );
    poly.add_contour(
        &pts(&[(3.0, 3.0), (3.0, 7.0), (7.0, 7.0), (7.0, 3.0)]),
        true,
        2,
    );
    poly
}

fn is_delaunay(mesh: &Triangulation) -> bool {
    mesh.triangles().all(|(_, t)| {
        let [a, b, c] = t.v.map(|v| mesh.pt(v));
        mesh.verts
            .iter()
            .enumerate()
            .all(|(i, v)| t.v.contains(&(i as u32)) || incircle(a, b, c, v.p) <= 0.0)
    })
}

#[test]
fn square_triangulates_into_two() {
    let mut tr = Triangulator::new();
    let mesh = tr
        .triangulate(&pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]))
        .unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    assert!(mesh.check_consistency().is_ok());
    assert_eq!(mesh.to_mesh().area(), 1.0);
}

#[test]
fn duplicates_are_merged() {
    let mut tr = Triangulator::new();
    let mesh = tr
        .triangulate(&pts(&[(0.0, 0.0), (2.0, 0.0), (0.0, 0.0), (1.0, 2.0), (2.0, 0.0)]))
        .unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.vertex_of_input(2), mesh.vertex_of_input(0));
    assert_eq!(mesh.vertex_of_input(4), mesh.vertex_of_input(1));
    assert_eq!(mesh.triangle_count(), 1);
}

#[test]
fn too_few_points_are_rejected() {
    let mut tr = Triangulator::new();
    assert_eq!(
        tr.triangulate(&pts(&[(0.0, 0.0), (1.0, 1.0)])).unwrap_err(),
        TriangulationError::TooFewPoints(2)
    );
    assert_eq!(
        tr.triangulate(&pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]))
            .unwrap_err(),
        TriangulationError::TooFewPoints(4)
    );
    assert!(matches!(
        tr.triangulate(&pts(&[(0.0, 0.0), (f64::NAN, 1.0), (2.0, 0.0)])),
        Err(TriangulationError::NonFinite { .. })
    ));
}

#[test]
fn inserted_points_keep_delaunay() {
    let mut tr = Triangulator::new();
    let mut mesh = tr
        .triangulate(&pts(&[(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)]))
        .unwrap();
    for p in [(4.0, 4.0), (1.0, 2.0), (6.5, 1.5), (4.0, 0.0), (2.0, 7.0)] {
        let r = mesh
            .insert_point(Point::new(p.0, p.1), VertexKind::Steiner, 0, INVALID)
            .unwrap();
        assert!(matches!(r, insert::Inserted::New(_)));
    }
    assert!(mesh.check_consistency().is_ok());
    assert!(is_delaunay(&mesh));
    assert_eq!(mesh.steiner_count(), 5);
    assert!((mesh.to_mesh().area() - 64.0).abs() < 1e-9);
    assert_eq!(
        mesh.insert_point(Point::new(4.0, 4.0), VertexKind::Steiner, 0, INVALID)
            .unwrap(),
        insert::Inserted::Existing(4)
    );
    assert_eq!(
        mesh.insert_point(Point::new(9.0, 4.0), VertexKind::Steiner, 0, INVALID)
            .unwrap(),
        insert::Inserted::Outside
    );
}

#[test]
fn flip_swaps_the_diagonal() {
    let mut tr = Triangulator::new();
    let mut mesh = tr
        .triangulate(&pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)]))
        .unwrap();
    let (t, tri) = mesh.triangles().next().map(|(t, tri)| (t, *tri)).unwrap();
    let i = (0..3).find(|&i| tri.n[i] != INVALID).unwrap();
    let before = (tri.v[next(i)], tri.v[prev(i)]);
    mesh.flip(t, i).unwrap();
    assert!(mesh.check_consistency().is_ok());
    assert!(mesh.find_edge(before.0, before.1).is_none());
}

#[test]
fn ring_is_carved_and_keeps_its_area() {
    let mut tr = Triangulator::new();
    let poly = square_with_hole();
    let mesh = tr
        .triangulate_polygon(&poly, &ConstraintOptions::default(), None)
        .unwrap();
    let out = mesh.to_mesh();
    assert!((out.area() - 84.0).abs() < 1e-9);
    assert_eq!(out.segments.len(), 8);
    for t in &out.triangles {
        let [a, b, c] = t.map(|i| out.vertices[i as usize]);
        let cx = (a[0] + b[0] + c[0]) / 3.0;
        let cy = (a[1] + b[1] + c[1]) / 3.0;
        assert!(!(cx > 3.0 && cx < 7.0 && cy > 3.0 && cy < 7.0));
    }
}

#[test]
fn flip_recovery_forces_a_missing_segment() {
    // The long diagonal of a thin rhombus is not Delaunay.
    let mut poly = Polygon::new();
    for p in pts(&[(0.0, 0.0), (5.0, -1.0), (10.0, 0.0), (5.0, 1.0)]) {
        poly.add_point(p);
    }
    for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)] {
        poly.add_segment(a, b, 0);
    }
    let mut tr = Triangulator::new();
    let mut mesh = tr.triangulate(&poly.points).unwrap();
    assert!(mesh.find_edge(0, 2).is_none());
    tr.apply_constraints(&mut mesh, &poly, &ConstraintOptions::default(), None)
        .unwrap();
    assert!(mesh.find_edge(0, 2).is_some());
    assert!(mesh.find_edge(1, 3).is_none());
    assert_eq!(mesh.steiner_count(), 0);
    assert_eq!(mesh.triangle_count(), 2);
}

#[test]
fn conforming_recovery_bisects() {
    let mut poly = Polygon::new();
    for p in pts(&[(0.0, 0.0), (5.0, -1.0), (10.0, 0.0), (5.0, 1.0)]) {
        poly.add_point(p);
    }
    for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
        poly.add_segment(a, b, 0);
    }
    poly.add_segment(0, 2, 3);
    let mut tr = Triangulator::new();
    let mut mesh = tr.triangulate(&poly.points).unwrap();
    let opts = ConstraintOptions::default().with_conforming_delaunay(true);
    tr.apply_constraints(&mut mesh, &poly, &opts, None).unwrap();
    assert!(mesh.steiner_count() >= 1);
    assert!(mesh
        .vertices()
        .iter()
        .any(|v| v.kind == VertexKind::Boundary && v.marker == 3));
    assert!(is_delaunay(&mesh));
    assert!(mesh.check_consistency().is_ok());
}

#[test]
fn vertex_on_segment_splits_it() {
    let mut poly = Polygon::new();
    for p in pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (2.0, 0.0)]) {
        poly.add_point(p);
    }
    for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
        poly.add_segment(a, b, 0);
    }
    let mut tr = Triangulator::new();
    let mesh = tr
        .triangulate_polygon(&poly, &ConstraintOptions::default(), None)
        .unwrap();
    assert_eq!(mesh.to_mesh().segments.len(), 5);
}

#[test]
fn bad_polygons_are_reported() {
    let mut tr = Triangulator::new();
    let mut poly = square_with_hole();
    let mut mesh = tr.triangulate(&poly.points).unwrap();
    poly.add_segment(0, 99, 0);
    assert_eq!(
        tr.apply_constraints(&mut mesh, &poly, &ConstraintOptions::default(), None),
        Err(TriangulationError::UnknownVertex(99))
    );
    poly.add_point(Point::new(5.0, 5.0));
    assert!(matches!(
        tr.apply_constraints(&mut mesh, &poly, &ConstraintOptions::default(), None),
        Err(TriangulationError::PointCountMismatch { polygon: 9, mesh: 8 })
    ));
}

#[test]
fn crossing_segments_are_refused() {
    let mut poly = Polygon::new();
    for p in pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]) {
        poly.add_point(p);
    }
    poly.add_segment(0, 2, 0);
    poly.add_segment(1, 3, 0);
    let mut tr = Triangulator::new();
    let opts = ConstraintOptions::default().with_split_crossings(false);
    assert!(matches!(
        tr.triangulate_polygon(&poly, &opts, None),
        Err(TriangulationError::CrossingSegments { .. })
    ));
}

#[test]
fn crossing_segments_meet_at_a_new_vertex() {
    let mut poly = Polygon::new();
    poly.add_contour(
        &pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
        false,
        1,
    );
    poly.add_segment(0, 2, 2);
    poly.add_segment(1, 3, 3);
    let mut tr = Triangulator::new();
    let mesh = tr
        .triangulate_polygon(&poly, &ConstraintOptions::default(), None)
        .unwrap();
    assert!(mesh.check_consistency().is_ok());
    assert_eq!(mesh.vertex_count(), 5);
    assert_eq!(mesh.triangle_count(), 4);
    assert_eq!(mesh.subsegs.len(), 8);
    let centre = mesh.vertices()[4];
    assert_eq!(centre.kind, VertexKind::Boundary);
    assert!((centre.p.x - 5.0).abs() < 1e-12 && (centre.p.y - 5.0).abs() < 1e-12);
    assert_eq!(mesh.to_mesh().area(), 100.0);
}

#[test]
fn overlapping_rings_carve_by_parity() {
    let mut poly = Polygon::new();
    poly.add_contour(&pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]), false, 1);
    poly.add_contour(&pts(&[(2.0, 2.0), (6.0, 2.0), (6.0, 6.0), (2.0, 6.0)]), false, 1);
    let opts = ConstraintOptions::default().with_carve_rule(CarveRule::EvenOdd);
    let mut tr = Triangulator::new();
    let mesh = tr.triangulate_polygon(&poly, &opts, None).unwrap();
    assert!(mesh.check_consistency().is_ok());
    // Both crossings became vertices.
    assert_eq!(mesh.vertex_count(), 10);
    assert!((mesh.to_mesh().area() - 24.0).abs() < 1e-9);
}

#[test]
fn coincident_edges_cancel_under_parity() {
    // The hole shares part of the outer's left edge.
    let mut poly = Polygon::new();
    poly.add_contour(&pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]), false, 1);
    poly.add_contour(&pts(&[(0.0, 3.0), (0.0, 7.0), (4.0, 7.0), (4.0, 3.0)]), false, 2);
    let opts = ConstraintOptions::default().with_carve_rule(CarveRule::EvenOdd);
    let mut tr = Triangulator::new();
    let mesh = tr.triangulate_polygon(&poly, &opts, None).unwrap();
    assert!(mesh.check_consistency().is_ok());
    assert!(mesh.subsegs.iter().any(|s| s.count == 2));
    assert!((mesh.to_mesh().area() - 84.0).abs() < 1e-9);
}

#[test]
fn vertex_hints_survive_carving() {
    let mut tr = Triangulator::new();
    let mesh = tr
        .triangulate_polygon(&square_with_hole(), &ConstraintOptions::default(), None)
        .unwrap();
    for (v, vert) in mesh.vertices().iter().enumerate() {
        let t = vert.tri;
        assert!(mesh.tris.get(t).map_or(false, |tri| tri.v.contains(&(v as u32))));
        assert!(!mesh.triangles_around(v as u32).is_empty());
    }
}

#[test]
fn refinement_meets_the_angle_bound() {
    let mut tr = Triangulator::new();
    let q = QualityOptions::default().with_min_angle(25.0);
    let mesh = tr
        .triangulate_polygon(
            &square_with_hole(),
            &ConstraintOptions::default().with_conforming_delaunay(true),
            Some(&q),
        )
        .unwrap();
    let stats = mesh.quality_stats();
    assert!(stats.min_angle >= 25.0 - 1e-6, "min angle {}", stats.min_angle);
    assert!((stats.total_area - 84.0).abs() < 1e-9);
}

#[test]
fn refinement_honours_max_area() {
    let mut tr = Triangulator::new();
    let q = QualityOptions::default().with_max_area(2.0);
    let mesh = tr
        .triangulate_polygon(&square_with_hole(), &ConstraintOptions::default(), Some(&q))
        .unwrap();
    let stats = mesh.quality_stats();
    assert!(stats.max_area <= 2.0);
    assert!(stats.triangles >= 42);
    assert!(mesh.check_consistency().is_ok());
}

#[test]
fn steiner_budget_caps_refinement() {
    let mut tr = Triangulator::new();
    let q = QualityOptions::default()
        .with_max_area(0.01)
        .with_steiner_budget(10);
    let mesh = tr
        .triangulate_polygon(&square_with_hole(), &ConstraintOptions::default(), Some(&q))
        .unwrap();
    assert_eq!(mesh.steiner_count(), 10);
    assert!(mesh.quality_stats().max_area > 0.01);
}

#[test]
fn predicate_marks_triangles_bad() {
    fn left_half(p: &[Point; 3], area: f64) -> bool {
        p.iter().all(|q| q.x <= 5.0) && area > 1.0
    }
    let mut tr = Triangulator::new();
    let q = QualityOptions::default()
        .with_min_angle(0.0)
        .with_predicate(left_half);
    let mesh = tr
        .triangulate_polygon(&square_with_hole(), &ConstraintOptions::default(), Some(&q))
        .unwrap();
    assert!(mesh
        .triangles()
        .all(|(_, t)| !left_half(&t.v.map(|v| mesh.pt(v)), t.area)));
}

#[test]
fn recycled_arenas_are_reused() {
    let mut tr = Triangulator::new();
    let first = tr
        .triangulate(&pts(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]))
        .unwrap();
    tr.recycle(first);
    let second = tr
        .triangulate(&pts(&[(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0)]))
        .unwrap();
    assert_eq!(second.triangle_count(), 2);
    assert_eq!(second.steiner_count(), 0);
    assert_eq!(second.to_mesh().vertices.len(), 4);
}
