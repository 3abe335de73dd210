// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Planar straight-line graph handed to the triangulator: points, the
// segments that must survive as mesh edges, and one locator point inside
// each hole.

use crate::predicates::Point;

/// A constrained edge between two point indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub a: u32,
    pub b: u32,
    /// Caller tag carried through to the mesh (boundary id, material edge...).
    pub marker: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    pub points: Vec<Point>,
    pub segments: Vec<Segment>,
    pub holes: Vec<Point>,
}

impl Polygon {
    pub fn new() -> Self {
        Polygon::default()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.segments.clear();
        self.holes.clear();
    }

    pub fn add_point(&mut self, p: Point) -> u32 {
        self.points.push(p);
        (self.points.len() - 1) as u32
    }

    pub fn add_segment(&mut self, a: u32, b: u32, marker: u32) {
        self.segments.push(Segment { a, b, marker });
    }

    pub fn add_hole(&mut self, p: Point) {
        self.holes.push(p);
    }

    /// Append a closed ring. A repeated closing point is ignored. When `hole`
    /// is set a locator point strictly inside the ring is recorded as well.
    /// Rings with fewer than three points add nothing and return false.
    pub fn add_contour(&mut self, ring: &[Point], hole: bool, marker: u32) -> bool {
        let mut ring = ring;
        if ring.len() > 1 && ring[0] == ring[ring.len() - 1] {
            ring = &ring[..ring.len() - 1];
        }
        if ring.len() < 3 {
            return false;
        }
        if hole {
            match interior_point(ring) {
                Some(p) => self.holes.push(p),
                None => return false,
            }
        }
        let first = self.points.len() as u32;
        self.points.extend_from_slice(ring);
        let n = ring.len() as u32;
        for i in 0..n {
            self.add_segment(first + i, first + (i + 1) % n, marker);
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// (min, max) corners of the point set.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }
}

/// Signed area of a ring, positive when counter-clockwise.
pub fn ring_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut a = 0.0;
    let mut j = n - 1;
    for i in 0..n {
        a += (ring[j].x + ring[i].x) * (ring[j].y - ring[i].y);
        j = i;
    }
    -a * 0.5
}

/// A point strictly inside a simple ring.
///
/// Casts a horizontal line halfway between the lowest vertex row and the next
/// one up (so it hits no vertex) and takes the midpoint of the first inside
/// span.
pub fn interior_point(ring: &[Point]) -> Option<Point> {
    let y_min = ring.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let y_next = ring
        .iter()
        .map(|p| p.y)
        .filter(|&y| y > y_min)
        .fold(f64::INFINITY, f64::min);
    if !y_next.is_finite() {
        return None;
    }
    let y = 0.5 * (y_min + y_next);
    let mut xs: Vec<f64> = Vec::new();
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (p, q) = (ring[j], ring[i]);
        if (p.y < y) != (q.y < y) {
            xs.push(p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y));
        }
        j = i;
    }
    xs.sort_by(f64::total_cmp);
    if xs.len() < 2 || xs[1] <= xs[0] {
        return None;
    }
    Some(Point::new(0.5 * (xs[0] + xs[1]), y))
}

/// Even-odd containment test for a float ring. Points on the boundary may
/// land on either side.
pub fn contains(ring: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn contour_adds_closed_segment_chain() {
        let mut poly = Polygon::new();
        assert!(poly.add_contour(
            &ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            false,
            7
        ));
        assert_eq!(poly.points.len(), 4);
        assert_eq!(poly.segments.len(), 4);
        assert_eq!(poly.segments[3], Segment { a: 3, b: 0, marker: 7 });
        assert!(poly.holes.is_empty());
    }

    #[test]
    fn hole_gets_a_locator_inside_it() {
        // Concave "U": the centroid falls outside, the locator must not.
        let u = ring(&[
            (0.0, 0.0),
            (6.0, 0.0),
            (6.0, 6.0),
            (4.0, 6.0),
            (4.0, 2.0),
            (2.0, 2.0),
            (2.0, 6.0),
            (0.0, 6.0),
        ]);
        let mut poly = Polygon::new();
        assert!(poly.add_contour(&u, true, 0));
        assert_eq!(poly.holes.len(), 1);
        assert!(contains(&u, poly.holes[0]));
    }

    #[test]
    fn degenerate_rings_are_refused() {
        let mut poly = Polygon::new();
        assert!(!poly.add_contour(&ring(&[(0.0, 0.0), (1.0, 1.0)]), false, 0));
        assert!(!poly.add_contour(&ring(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)]), true, 0));
        assert!(poly.is_empty());
    }

    #[test]
    fn ring_area_sign() {
        let mut sq = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        assert_eq!(ring_area(&sq), 4.0);
        sq.reverse();
        assert_eq!(ring_area(&sq), -4.0);
    }
}
