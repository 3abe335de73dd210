// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Fixed-point 2D primitives shared by the clipping engine and the pipeline.
//
// Coordinates are scaled integers. Every product that feeds a sign decision
// is evaluated in i128, so slope and orientation tests are exact over the
// whole accepted range.

use crate::error::ClipError;

/// Largest magnitude accepted for a coordinate.
pub const HI_RANGE: i64 = 0x3FFF_FFFF_FFFF_FFFF;

/// Sentinel Dx for horizontal edges.
pub const HORIZONTAL: f64 = -3.4e38;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        IntPoint { x, y }
    }

    /// Scale a float coordinate into the fixed-point domain.
    #[inline]
    pub fn from_float(x: f64, y: f64, scale: f64) -> Self {
        IntPoint {
            x: round(x * scale),
            y: round(y * scale),
        }
    }

    #[inline]
    pub fn to_float(self, scale: f64) -> [f64; 2] {
        [self.x as f64 / scale, self.y as f64 / scale]
    }
}

/// An ordered point sequence, implicitly closed.
pub type Path = Vec<IntPoint>;
pub type Paths = Vec<Path>;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FloatPoint {
    pub x: f64,
    pub y: f64,
}

impl FloatPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        FloatPoint { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl IntRect {
    /// The rectangle as a counter-clockwise closed path.
    pub fn to_path(&self) -> Path {
        vec![
            IntPoint::new(self.left, self.top),
            IntPoint::new(self.right, self.top),
            IntPoint::new(self.right, self.bottom),
            IntPoint::new(self.left, self.bottom),
        ]
    }

    #[inline]
    pub fn contains_rect(&self, other: &IntRect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    #[inline]
    fn mid_point(&self) -> IntPoint {
        IntPoint::new(
            self.left + (self.right - self.left) / 2,
            self.top + (self.bottom - self.top) / 2,
        )
    }
}

/// Round half away from zero.
#[inline]
pub fn round(v: f64) -> i64 {
    if v < 0.0 {
        (v - 0.5) as i64
    } else {
        (v + 0.5) as i64
    }
}

#[inline]
pub fn range_test(pt: IntPoint) -> Result<(), ClipError> {
    if pt.x > HI_RANGE || pt.y > HI_RANGE || -pt.x > HI_RANGE || -pt.y > HI_RANGE {
        return Err(ClipError::CoordinateOutOfRange { x: pt.x, y: pt.y });
    }
    Ok(())
}

/// Cross product of (b - a) and (c - a), exact.
#[inline]
pub fn cross(a: IntPoint, b: IntPoint, c: IntPoint) -> i128 {
    (b.x as i128 - a.x as i128) * (c.y as i128 - a.y as i128)
        - (b.y as i128 - a.y as i128) * (c.x as i128 - a.x as i128)
}

/// True when pt1-pt2 and pt2-pt3 are parallel.
#[inline]
pub fn slopes_equal3(pt1: IntPoint, pt2: IntPoint, pt3: IntPoint) -> bool {
    (pt1.y as i128 - pt2.y as i128) * (pt2.x as i128 - pt3.x as i128)
        == (pt1.x as i128 - pt2.x as i128) * (pt2.y as i128 - pt3.y as i128)
}

/// True when pt1-pt2 and pt3-pt4 are parallel.
#[inline]
pub fn slopes_equal4(pt1: IntPoint, pt2: IntPoint, pt3: IntPoint, pt4: IntPoint) -> bool {
    (pt1.y as i128 - pt2.y as i128) * (pt3.x as i128 - pt4.x as i128)
        == (pt1.x as i128 - pt2.x as i128) * (pt3.y as i128 - pt4.y as i128)
}

/// True when pt2 lies strictly between pt1 and pt3 on their common line.
pub fn pt2_is_between_pt1_and_pt3(pt1: IntPoint, pt2: IntPoint, pt3: IntPoint) -> bool {
    if pt1 == pt3 || pt1 == pt2 || pt3 == pt2 {
        false
    } else if pt1.x != pt3.x {
        (pt2.x > pt1.x) == (pt2.x < pt3.x)
    } else {
        (pt2.y > pt1.y) == (pt2.y < pt3.y)
    }
}

/// Signed area, positive for counter-clockwise rings in a y-up frame.
pub fn area(path: &[IntPoint]) -> f64 {
    let cnt = path.len();
    if cnt < 3 {
        return 0.0;
    }
    let mut a = 0.0f64;
    let mut j = cnt - 1;
    for i in 0..cnt {
        a += (path[j].x as f64 + path[i].x as f64) * (path[j].y as f64 - path[i].y as f64);
        j = i;
    }
    -a * 0.5
}

#[inline]
pub fn orientation(path: &[IntPoint]) -> bool {
    area(path) >= 0.0
}

/// 0 when outside, 1 when inside, -1 when `pt` lies on the boundary.
pub fn point_in_polygon(pt: IntPoint, path: &[IntPoint]) -> i32 {
    let cnt = path.len();
    if cnt < 3 {
        return 0;
    }
    let mut result = 0;
    let mut ip = path[0];
    for i in 1..=cnt {
        let ip_next = if i == cnt { path[0] } else { path[i] };
        if ip_next.y == pt.y
            && (ip_next.x == pt.x || (ip.y == pt.y && ((ip_next.x > pt.x) == (ip.x < pt.x))))
        {
            return -1;
        }
        if (ip.y < pt.y) != (ip_next.y < pt.y) {
            if ip.x >= pt.x {
                if ip_next.x > pt.x {
                    result = 1 - result;
                } else {
                    let d = (ip.x as i128 - pt.x as i128) * (ip_next.y as i128 - pt.y as i128)
                        - (ip_next.x as i128 - pt.x as i128) * (ip.y as i128 - pt.y as i128);
                    if d == 0 {
                        return -1;
                    }
                    if (d > 0) == (ip_next.y > ip.y) {
                        result = 1 - result;
                    }
                }
            } else if ip_next.x > pt.x {
                let d = (ip.x as i128 - pt.x as i128) * (ip_next.y as i128 - pt.y as i128)
                    - (ip_next.x as i128 - pt.x as i128) * (ip.y as i128 - pt.y as i128);
                if d == 0 {
                    return -1;
                }
                if (d > 0) == (ip_next.y > ip.y) {
                    result = 1 - result;
                }
            }
        }
        ip = ip_next;
    }
    result
}

pub fn bounds(paths: &[Path]) -> IntRect {
    points_bounds(paths.iter().flatten())
}

#[inline]
pub fn path_bounds(path: &[IntPoint]) -> IntRect {
    points_bounds(path.iter())
}

fn points_bounds<'a>(mut pts: impl Iterator<Item = &'a IntPoint>) -> IntRect {
    let first = match pts.next() {
        Some(p) => *p,
        None => return IntRect::default(),
    };
    let mut r = IntRect {
        left: first.x,
        top: first.y,
        right: first.x,
        bottom: first.y,
    };
    for p in pts {
        r.left = r.left.min(p.x);
        r.right = r.right.max(p.x);
        r.top = r.top.min(p.y);
        r.bottom = r.bottom.max(p.y);
    }
    r
}

/// True when ring `inner` lies inside ring `outer`.
///
/// Vertices of `inner` vote; a vertex on the boundary of `outer` abstains.
/// Two votes of margin settle it, otherwise the centre of `inner`'s bounds
/// decides. Rings that touch or share edges are therefore classified by
/// where most of them lies.
pub fn path_in_path(inner: &[IntPoint], outer: &[IntPoint]) -> bool {
    let mut outside = 0i32;
    for &p in inner {
        match point_in_polygon(p, outer) {
            0 => outside += 1,
            1 => outside -= 1,
            _ => continue,
        }
        if outside.abs() > 1 {
            return outside < 0;
        }
    }
    let mid = path_bounds(inner).mid_point();
    point_in_polygon(mid, outer) == 1
}

/// For each ring, the index of the smallest ring enclosing it.
///
/// Rings must not cross each other, though they may touch. A ring can only
/// be enclosed by one of strictly larger absolute area.
pub fn ring_parents(paths: &[Path]) -> Vec<Option<usize>> {
    let sizes: Vec<f64> = paths.iter().map(|p| area(p).abs()).collect();
    let boxes: Vec<IntRect> = paths.iter().map(|p| path_bounds(p)).collect();
    (0..paths.len())
        .map(|i| {
            (0..paths.len())
                .filter(|&j| {
                    sizes[j] > sizes[i]
                        && boxes[j].contains_rect(&boxes[i])
                        && path_in_path(&paths[i], &paths[j])
                })
                .min_by(|&a, &b| sizes[a].total_cmp(&sizes[b]))
        })
        .collect()
}

/// Nesting depth per ring, 0 for rings nothing encloses.
pub fn ring_depths(parents: &[Option<usize>]) -> Vec<usize> {
    (0..parents.len())
        .map(|i| {
            let mut depth = 0;
            let mut cur = parents[i];
            // Parents strictly grow in area, so the chain ends.
            while let Some(p) = cur {
                depth += 1;
                cur = parents[p];
            }
            depth
        })
        .collect()
}

/// Orient rings by nesting: even depth counter-clockwise, odd depth
/// clockwise, or the other way round when `reverse` is set.
pub fn orient_by_nesting(paths: &mut Paths, reverse: bool) {
    let depths = ring_depths(&ring_parents(paths));
    for (path, depth) in paths.iter_mut().zip(depths) {
        let want_ccw = (depth % 2 == 0) != reverse;
        if (area(path) > 0.0) != want_ccw {
            path.reverse();
        }
    }
}

pub fn reverse_paths(paths: &mut Paths) {
    for p in paths.iter_mut() {
        p.reverse();
    }
}

/// Scale float rings into the fixed-point domain.
pub fn paths_from_float(rings: &[Vec<[f64; 2]>], scale: f64) -> Paths {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|p| IntPoint::from_float(p[0], p[1], scale))
                .collect()
        })
        .collect()
}

pub fn path_to_float(path: &[IntPoint], scale: f64) -> Vec<[f64; 2]> {
    path.iter().map(|p| p.to_float(scale)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i64, y0: i64, size: i64) -> Path {
        vec![
            IntPoint::new(x0, y0),
            IntPoint::new(x0 + size, y0),
            IntPoint::new(x0 + size, y0 + size),
            IntPoint::new(x0, y0 + size),
        ]
    }

    #[test]
    fn area_is_signed() {
        let mut sq = square(0, 0, 10);
        assert_eq!(area(&sq), 100.0);
        assert!(orientation(&sq));
        sq.reverse();
        assert_eq!(area(&sq), -100.0);
        assert!(!orientation(&sq));
    }

    #[test]
    fn round_is_half_away_from_zero() {
        assert_eq!(round(2.5), 3);
        assert_eq!(round(-2.5), -3);
        assert_eq!(round(2.49), 2);
    }

    #[test]
    fn float_scaling_round_trips() {
        let p = IntPoint::from_float(1.25, -3.5, 1000.0);
        assert_eq!(p, IntPoint::new(1250, -3500));
        assert_eq!(p.to_float(1000.0), [1.25, -3.5]);
    }

    #[test]
    fn point_in_polygon_classifies() {
        let sq = square(0, 0, 10);
        assert_eq!(point_in_polygon(IntPoint::new(5, 5), &sq), 1);
        assert_eq!(point_in_polygon(IntPoint::new(15, 5), &sq), 0);
        assert_eq!(point_in_polygon(IntPoint::new(10, 5), &sq), -1);
        assert_eq!(point_in_polygon(IntPoint::new(0, 0), &sq), -1);
    }

    #[test]
    fn slopes_are_exact_at_large_magnitudes() {
        let k = HI_RANGE / 2;
        let a = IntPoint::new(0, 0);
        let b = IntPoint::new(k, k - 1);
        let c = IntPoint::new(2 * k, 2 * k - 2);
        assert!(slopes_equal3(a, b, c));
        let d = IntPoint::new(2 * k, 2 * k - 1);
        assert!(!slopes_equal3(a, b, d));
    }

    #[test]
    fn range_test_rejects_huge_values() {
        assert!(range_test(IntPoint::new(HI_RANGE, 0)).is_ok());
        assert!(range_test(IntPoint::new(i64::MAX, 0)).is_err());
        assert!(range_test(IntPoint::new(0, i64::MIN + 1)).is_err());
    }

    #[test]
    fn between_test() {
        let a = IntPoint::new(0, 0);
        let b = IntPoint::new(5, 0);
        let c = IntPoint::new(10, 0);
        assert!(pt2_is_between_pt1_and_pt3(a, b, c));
        assert!(!pt2_is_between_pt1_and_pt3(a, c, b));
    }

    #[test]
    fn bounds_cover_all_paths() {
        let r = bounds(&[square(0, 0, 10), square(-5, 20, 3)]);
        assert_eq!(r, IntRect { left: -5, top: 0, right: 10, bottom: 23 });
    }

    #[test]
    fn touching_hole_still_nests() {
        // The hole shares the outer's left edge and a corner.
        let outer = square(0, 0, 10);
        let hole = vec![
            IntPoint::new(0, 0),
            IntPoint::new(0, 4),
            IntPoint::new(3, 2),
        ];
        assert!(path_in_path(&hole, &outer));
        assert!(!path_in_path(&outer, &hole));
        let island = square(20, 0, 2);
        assert!(!path_in_path(&island, &outer));
    }

    #[test]
    fn nesting_orients_by_depth() {
        let mut rings = vec![square(3, 3, 2), square(0, 0, 10), square(2, 2, 6), square(20, 20, 1)];
        rings[1].reverse();
        let parents = ring_parents(&rings);
        assert_eq!(parents, vec![Some(2), None, Some(1), None]);
        assert_eq!(ring_depths(&parents), vec![2, 0, 1, 0]);

        orient_by_nesting(&mut rings, false);
        let signs: Vec<bool> = rings.iter().map(|r| area(r) > 0.0).collect();
        assert_eq!(signs, vec![true, true, false, true]);
        orient_by_nesting(&mut rings, true);
        let signs: Vec<bool> = rings.iter().map(|r| area(r) > 0.0).collect();
        assert_eq!(signs, vec![false, false, true, false]);
    }
}
