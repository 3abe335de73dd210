// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Unit tests for the clipping sweep.

use super::*;
use crate::geom::area;

fn square(x0: i64, y0: i64, size: i64) -> Vec<IntPoint> {
    vec![
        IntPoint::new(x0, y0),
        IntPoint::new(x0 + size, y0),
        IntPoint::new(x0 + size, y0 + size),
        IntPoint::new(x0, y0 + size),
    ]
}

fn total_area(paths: &Paths) -> f64 {
    paths.iter().map(|p| area(p)).sum()
}

fn run(clip_type: ClipType, subject: &[Vec<IntPoint>], clip: &[Vec<IntPoint>]) -> Paths {
    boolean_op(clip_type, subject, clip, FillRule::NonZero).unwrap()
}

#[test]
fn overlapping_squares_all_operations() {
    let a = vec![square(0, 0, 10)];
    let b = vec![square(5, 5, 10)];
    assert_eq!(total_area(&run(ClipType::Union, &a, &b)), 175.0);
    assert_eq!(total_area(&run(ClipType::Intersection, &a, &b)), 25.0);
    assert_eq!(total_area(&run(ClipType::Difference, &a, &b)), 75.0);
    assert_eq!(total_area(&run(ClipType::Xor, &a, &b)), 150.0);
}

#[test]
fn union_output_is_counter_clockwise() {
    let out = run(ClipType::Union, &[square(0, 0, 10)], &[square(5, 5, 10)]);
    assert_eq!(out.len(), 1);
    assert!(area(&out[0]) > 0.0);
    // Two reflex corners plus the six convex ones.
    assert_eq!(out[0].len(), 8);
}

#[test]
fn disjoint_union_keeps_both() {
    let out = run(
        ClipType::Union,
        &[square(0, 0, 10), square(20, 0, 10)],
        &[],
    );
    assert_eq!(out.len(), 2);
    assert_eq!(total_area(&out), 200.0);
}

#[test]
fn hole_is_clockwise() {
    let mut hole = square(3, 3, 4);
    hole.reverse();
    let out = boolean_op(
        ClipType::Union,
        &[square(0, 0, 10), hole],
        &[],
        FillRule::EvenOdd,
    )
    .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(total_area(&out), 84.0);
    assert_eq!(out.iter().filter(|p| area(p) < 0.0).count(), 1);
}

#[test]
fn fill_rule_decides_self_overlap() {
    let subject = vec![square(0, 0, 10), square(5, 5, 10)];
    let non_zero = boolean_op(ClipType::Union, &subject, &[], FillRule::NonZero).unwrap();
    assert_eq!(total_area(&non_zero), 175.0);
    let even_odd = boolean_op(ClipType::Union, &subject, &[], FillRule::EvenOdd).unwrap();
    assert_eq!(total_area(&even_odd), 150.0);
}

#[test]
fn reverse_solution_flips_orientation() {
    let mut c = Clipper::with_options(ClipOptions::default().with_reverse_solution(true));
    c.add_path(&square(0, 0, 10), PolyType::Subject, true).unwrap();
    let out = c
        .execute(ClipType::Union, FillRule::NonZero, FillRule::NonZero)
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(area(&out[0]), -100.0);
}

#[test]
fn degenerate_paths_are_rejected() {
    let mut c = Clipper::new();
    let two = vec![IntPoint::new(0, 0), IntPoint::new(5, 5), IntPoint::new(0, 0)];
    assert_eq!(
        c.add_path(&two, PolyType::Subject, true),
        Err(ClipError::TooFewVertices(2))
    );
    let collinear = vec![IntPoint::new(0, 0), IntPoint::new(5, 5), IntPoint::new(10, 10)];
    assert!(matches!(
        c.add_path(&collinear, PolyType::Subject, true),
        Err(ClipError::TooFewVertices(_))
    ));
    assert_eq!(
        c.add_path(&square(0, 0, 1), PolyType::Subject, false),
        Err(ClipError::OpenPathUnsupported)
    );
    let huge = vec![
        IntPoint::new(0, 0),
        IntPoint::new(i64::MAX, 0),
        IntPoint::new(0, 10),
    ];
    assert!(matches!(
        c.add_path(&huge, PolyType::Subject, true),
        Err(ClipError::CoordinateOutOfRange { .. })
    ));
    assert!(c.is_empty());
}

#[test]
fn add_paths_reports_rejects_by_index() {
    let mut c = Clipper::new();
    let bad = vec![IntPoint::new(0, 0), IntPoint::new(1, 1)];
    let rejected = c
        .add_paths(&[square(0, 0, 4), bad, square(10, 0, 4)], PolyType::Subject, true)
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0, 1);
    let out = c
        .execute(ClipType::Union, FillRule::NonZero, FillRule::NonZero)
        .unwrap();
    assert_eq!(total_area(&out), 32.0);
}

#[test]
fn execute_can_run_twice() {
    let mut c = Clipper::new();
    c.add_path(&square(0, 0, 10), PolyType::Subject, true).unwrap();
    c.add_path(&square(5, 0, 10), PolyType::Clip, true).unwrap();
    let i = c
        .execute(ClipType::Intersection, FillRule::NonZero, FillRule::NonZero)
        .unwrap();
    let u = c
        .execute(ClipType::Union, FillRule::NonZero, FillRule::NonZero)
        .unwrap();
    assert_eq!(total_area(&i), 50.0);
    assert_eq!(total_area(&u), 150.0);
    c.clear();
    assert!(c.is_empty());
    let empty = c
        .execute(ClipType::Union, FillRule::NonZero, FillRule::NonZero)
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn shared_edges_merge_into_one_ring() {
    // Two squares touching along x = 10 fuse into a rectangle.
    let out = run(ClipType::Union, &[square(0, 0, 10), square(10, 0, 10)], &[]);
    assert_eq!(out.len(), 1);
    assert_eq!(total_area(&out), 200.0);
    assert_eq!(out[0].len(), 4);
}

#[test]
fn triangle_clipped_by_rectangle() {
    let tri = vec![
        IntPoint::new(0, 0),
        IntPoint::new(20, 0),
        IntPoint::new(10, 20),
    ];
    let rect = vec![square(0, 0, 10)];
    let out = run(ClipType::Intersection, &[tri], &rect);
    assert_eq!(out.len(), 1);
    // Trapezoid under y = 10: x from 0..10 at the base, 5..10 on top.
    assert_eq!(total_area(&out), 75.0);
}

#[test]
fn difference_cuts_a_hole() {
    let out = run(ClipType::Difference, &[square(0, 0, 30)], &[square(10, 10, 10)]);
    assert_eq!(out.len(), 2);
    assert_eq!(total_area(&out), 800.0);
}

#[test]
fn winding_rule_fill_test() {
    assert!(FillRule::EvenOdd.is_filled(3));
    assert!(!FillRule::EvenOdd.is_filled(-2));
    assert!(FillRule::NonZero.is_filled(-1));
    assert!(FillRule::Positive.is_filled(2));
    assert!(!FillRule::Positive.is_filled(-1));
    assert!(FillRule::Negative.is_filled(-1));
}

fn ring(pts: &[(i64, i64)]) -> Vec<IntPoint> {
    pts.iter().map(|&(x, y)| IntPoint::new(x, y)).collect()
}

#[test]
fn split_rings_come_out_as_outers() {
    // A self-touching subject whose lobes get split apart by joins.
    let a = ring(&[
        (4, 1),
        (9, 2),
        (10, 2),
        (19, 0),
        (13, 16),
        (13, 17),
        (2, 4),
        (10, 2),
        (7, 2),
    ]);
    let b = ring(&[(6, 1), (3, 2), (1, 9), (1, 3), (3, 2), (4, 0)]);
    let out = boolean_op(ClipType::Union, &[a, b], &[], FillRule::NonZero).unwrap();
    assert!(!out.is_empty());
    for p in &out {
        assert!(area(p) > 0.0, "clockwise ring {:?}", p);
    }
    assert!((total_area(&out) - 139.5).abs() < 1.0, "area {}", total_area(&out));
}

#[test]
fn result_orientation_follows_nesting() {
    let mut hole = square(2, 2, 16);
    hole.reverse();
    let subject = vec![square(0, 0, 20), hole, square(6, 6, 8)];
    for reverse in [false, true] {
        let mut c = Clipper::with_options(ClipOptions::default().with_reverse_solution(reverse));
        c.add_paths(&subject, PolyType::Subject, true).unwrap();
        let out = c
            .execute(ClipType::Union, FillRule::EvenOdd, FillRule::EvenOdd)
            .unwrap();
        assert_eq!(out.len(), 3);
        let mut signed: Vec<f64> = out.iter().map(|p| area(p)).collect();
        signed.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
        let s = if reverse { -1.0 } else { 1.0 };
        assert_eq!(signed, vec![64.0 * s, -256.0 * s, 400.0 * s]);
    }
}
