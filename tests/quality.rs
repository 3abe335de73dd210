// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
// Quality refinement: angle and area bounds, budgets, segment preservation.

mod helpers;

use approx::assert_relative_eq;
use helpers::{min_angle, on_segment, points, triangle_points};
use tilemesh::polygon::ring_area;
use tilemesh::{ConstraintOptions, Point, Polygon, QualityOptions, Triangulator, VertexKind};

const L_SHAPE: [[f64; 2]; 6] = [
    [0.0, 0.0],
    [4.0, 0.0],
    [4.0, 1.0],
    [1.0, 1.0],
    [1.0, 4.0],
    [0.0, 4.0],
];

fn outline_polygon(outline: &[[f64; 2]]) -> Polygon {
    let mut polygon = Polygon::new();
    assert!(polygon.add_contour(&points(outline), false, 1));
    polygon
}

fn tri_area(p: [[f64; 2]; 3]) -> f64 {
    0.5 * ((p[1][0] - p[0][0]) * (p[2][1] - p[0][1]) - (p[1][1] - p[0][1]) * (p[2][0] - p[0][0]))
}

#[test]
fn l_shape_meets_angle_and_area_bounds() {
    helpers::init_logging();
    let quality = QualityOptions::default().with_min_angle(25.0).with_max_area(0.1);
    let constraints = ConstraintOptions::default().with_conforming_delaunay(true);
    let mut tri = Triangulator::new();
    let mesh = tri
        .triangulate_polygon(&outline_polygon(&L_SHAPE), &constraints, Some(&quality))
        .unwrap();
    mesh.check_consistency().unwrap();
    let flat = mesh.to_mesh();
    assert_relative_eq!(flat.area(), 7.0, epsilon = 1e-9);
    for t in 0..flat.triangles.len() {
        let p = triangle_points(&flat, t);
        assert!(min_angle(p) >= 25.0 - 1e-6, "triangle {} has angle {}", t, min_angle(p));
        assert!(tri_area(p) <= 0.1 + 1e-12, "triangle {} has area {}", t, tri_area(p));
    }
    let stats = mesh.quality_stats();
    assert_eq!(stats.triangles, flat.triangles.len());
    assert!(stats.min_angle >= 25.0 - 1e-6);
}

#[test]
fn refinement_keeps_segments_and_boundary_vertices_on_them() {
    let quality = QualityOptions::default().with_max_area(0.05);
    let constraints = ConstraintOptions::default().with_conforming_delaunay(true);
    let mut tri = Triangulator::new();
    let mesh = tri
        .triangulate_polygon(&outline_polygon(&L_SHAPE), &constraints, Some(&quality))
        .unwrap();
    let edges: Vec<([f64; 2], [f64; 2])> = (0..L_SHAPE.len())
        .map(|i| (L_SHAPE[i], L_SHAPE[(i + 1) % L_SHAPE.len()]))
        .collect();

    let mut boundary = 0;
    for v in mesh.vertices() {
        let q = [v.p.x, v.p.y];
        let on_outline = edges.iter().any(|&(a, b)| on_segment(a, b, q, 1e-9));
        match v.kind {
            VertexKind::Boundary => {
                boundary += 1;
                assert!(on_outline, "boundary vertex ({}, {}) is off the outline", q[0], q[1]);
                assert_eq!(v.marker, 1);
            }
            VertexKind::Steiner => assert!(!on_outline),
            VertexKind::Input => {}
        }
    }
    assert!(boundary > 0);
    assert!(mesh.steiner_count() >= boundary);

    let flat = mesh.to_mesh();
    for &(a, b) in &edges {
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

#[test]
fn sharp_input_corner_stops_at_the_budget() {
    // A 10 degree spike cannot be fixed; refinement must still end.
    let tip = 10f64.to_radians();
    let outline = [[0.0, 0.0], [10.0, 0.0], [10.0 * tip.cos(), 10.0 * tip.sin()]];
    let quality = QualityOptions::default()
        .with_min_angle(30.0)
        .with_steiner_budget(150);
    let mut tri = Triangulator::new();
    let mesh = tri
        .triangulate_polygon(
            &outline_polygon(&outline),
            &ConstraintOptions::default().with_conforming_delaunay(true),
            Some(&quality),
        )
        .unwrap();
    mesh.check_consistency().unwrap();
    assert!(mesh.steiner_count() <= 150);
    assert_relative_eq!(
        mesh.to_mesh().area(),
        ring_area(&points(&outline)),
        max_relative = 1e-9
    );
}

#[test]
fn predicate_refines_selected_triangles() {
    fn near_origin(p: &[Point; 3], area: f64) -> bool {
        let cx = (p[0].x + p[1].x + p[2].x) / 3.0;
        let cy = (p[0].y + p[1].y + p[2].y) / 3.0;
        cx < 1.0 && cy < 1.0 && area > 0.01
    }
    let quality = QualityOptions::default().with_predicate(near_origin);
    let mut tri = Triangulator::new();
    let mesh = tri
        .triangulate_polygon(
            &outline_polygon(&L_SHAPE),
            &ConstraintOptions::default(),
            Some(&quality),
        )
        .unwrap();
    let flat = mesh.to_mesh();
    for t in 0..flat.triangles.len() {
        let p = triangle_points(&flat, t);
        let c = helpers::centroid(p);
        if c[0] < 1.0 && c[1] < 1.0 {
            assert!(tri_area(p) <= 0.01 + 1e-12);
        }
    }
    assert!(mesh.steiner_count() > 0);
}
