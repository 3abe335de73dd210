// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Orientation and in-circle tests on f64 coordinates.
//
// Each predicate first evaluates the determinant in plain floating point
// together with a forward error bound. Only when the result is too close to
// zero to trust is it recomputed exactly with floating-point expansions
// (Shewchuk's two-sum / two-product arithmetic). The returned value always
// has the sign of the exact determinant.

const EPSILON: f64 = 1.110_223_024_625_156_5e-16; // 2^-53
const SPLITTER: f64 = 134_217_729.0; // 2^27 + 1
const CCW_ERR_BOUND_A: f64 = (3.0 + 16.0 * EPSILON) * EPSILON;
const ICC_ERR_BOUND_A: f64 = (10.0 + 96.0 * EPSILON) * EPSILON;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Point::new(p[0], p[1])
    }
}

/// Positive when a, b, c turn counter-clockwise, negative when clockwise,
/// zero when collinear.
pub fn orient2d(a: Point, b: Point, c: Point) -> f64 {
    let detleft = (a.x - c.x) * (b.y - c.y);
    let detright = (a.y - c.y) * (b.x - c.x);
    let det = detleft - detright;

    let detsum = if detleft > 0.0 {
        if detright <= 0.0 {
            return det;
        }
        detleft + detright
    } else if detleft < 0.0 {
        if detright >= 0.0 {
            return det;
        }
        -detleft - detright
    } else {
        return det;
    };

    let errbound = CCW_ERR_BOUND_A * detsum;
    if det >= errbound || -det >= errbound {
        return det;
    }
    orient2d_exact(a, b, c)
}

/// Positive when d lies inside the circle through a, b, c (given
/// counter-clockwise), negative when outside, zero when cocircular.
pub fn incircle(a: Point, b: Point, c: Point, d: Point) -> f64 {
    let adx = a.x - d.x;
    let bdx = b.x - d.x;
    let cdx = c.x - d.x;
    let ady = a.y - d.y;
    let bdy = b.y - d.y;
    let cdy = c.y - d.y;

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let alift = adx * adx + ady * ady;

    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let blift = bdx * bdx + bdy * bdy;

    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);

    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
        + (cdxady.abs() + adxcdy.abs()) * blift
        + (adxbdy.abs() + bdxady.abs()) * clift;
    let errbound = ICC_ERR_BOUND_A * permanent;
    if det > errbound || -det > errbound {
        return det;
    }
    incircle_exact(a, b, c, d)
}

// ─────────────────────────── Expansion arithmetic ───────────────────────────

#[inline]
fn fast_two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    let bvirt = x - a;
    (x, b - bvirt)
}

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    let bvirt = x - a;
    let avirt = x - bvirt;
    let bround = b - bvirt;
    let around = a - avirt;
    (x, around + bround)
}

#[inline]
fn two_diff(a: f64, b: f64) -> (f64, f64) {
    let x = a - b;
    let bvirt = a - x;
    let avirt = x + bvirt;
    let bround = bvirt - b;
    let around = a - avirt;
    (x, around + bround)
}

#[inline]
fn split(a: f64) -> (f64, f64) {
    let c = SPLITTER * a;
    let abig = c - a;
    let ahi = c - abig;
    (ahi, a - ahi)
}

#[inline]
fn two_product(a: f64, b: f64) -> (f64, f64) {
    let x = a * b;
    let (ahi, alo) = split(a);
    let (bhi, blo) = split(b);
    let err1 = x - ahi * bhi;
    let err2 = err1 - alo * bhi;
    let err3 = err2 - ahi * blo;
    (x, alo * blo - err3)
}

/// Exact difference a - b as a two-component expansion (small first).
#[inline]
fn diff_expansion(a: f64, b: f64) -> Vec<f64> {
    let (x, y) = two_diff(a, b);
    vec![y, x]
}

fn grow_expansion(e: &[f64], b: f64) -> Vec<f64> {
    let mut h = Vec::with_capacity(e.len() + 1);
    let mut q = b;
    for &enow in e {
        let (sum, hh) = two_sum(q, enow);
        q = sum;
        if hh != 0.0 {
            h.push(hh);
        }
    }
    if q != 0.0 || h.is_empty() {
        h.push(q);
    }
    h
}

fn expansion_sum(e: &[f64], f: &[f64]) -> Vec<f64> {
    let mut h = e.to_vec();
    for &fnow in f {
        h = grow_expansion(&h, fnow);
    }
    h
}

fn scale_expansion(e: &[f64], b: f64) -> Vec<f64> {
    let mut h = Vec::with_capacity(e.len() * 2);
    let (mut q, hh) = two_product(e[0], b);
    if hh != 0.0 {
        h.push(hh);
    }
    for &enow in &e[1..] {
        let (product1, product0) = two_product(enow, b);
        let (sum, hh) = two_sum(q, product0);
        if hh != 0.0 {
            h.push(hh);
        }
        let (nq, hh) = fast_two_sum(product1, sum);
        q = nq;
        if hh != 0.0 {
            h.push(hh);
        }
    }
    if q != 0.0 || h.is_empty() {
        h.push(q);
    }
    h
}

fn expansion_product(e: &[f64], f: &[f64]) -> Vec<f64> {
    let mut acc = vec![0.0];
    for &fnow in f {
        let part = scale_expansion(e, fnow);
        acc = expansion_sum(&acc, &part);
    }
    acc
}

fn negate(e: &[f64]) -> Vec<f64> {
    e.iter().map(|v| -v).collect()
}

/// Approximate value; carries the sign of the exact sum.
fn estimate(e: &[f64]) -> f64 {
    e.iter().sum()
}

fn orient2d_exact(a: Point, b: Point, c: Point) -> f64 {
    let acx = diff_expansion(a.x, c.x);
    let acy = diff_expansion(a.y, c.y);
    let bcx = diff_expansion(b.x, c.x);
    let bcy = diff_expansion(b.y, c.y);
    let left = expansion_product(&acx, &bcy);
    let right = expansion_product(&acy, &bcx);
    let det = expansion_sum(&left, &negate(&right));
    estimate(&det)
}

fn incircle_exact(a: Point, b: Point, c: Point, d: Point) -> f64 {
    let adx = diff_expansion(a.x, d.x);
    let ady = diff_expansion(a.y, d.y);
    let bdx = diff_expansion(b.x, d.x);
    let bdy = diff_expansion(b.y, d.y);
    let cdx = diff_expansion(c.x, d.x);
    let cdy = diff_expansion(c.y, d.y);

    let lift = |dx: &[f64], dy: &[f64]| {
        expansion_sum(&expansion_product(dx, dx), &expansion_product(dy, dy))
    };
    let cross = |px: &[f64], py: &[f64], qx: &[f64], qy: &[f64]| {
        expansion_sum(
            &expansion_product(px, qy),
            &negate(&expansion_product(qx, py)),
        )
    };

    let alift = lift(&adx, &ady);
    let blift = lift(&bdx, &bdy);
    let clift = lift(&cdx, &cdy);

    let bc = cross(&bdx, &bdy, &cdx, &cdy);
    let ca = cross(&cdx, &cdy, &adx, &ady);
    let ab = cross(&adx, &ady, &bdx, &bdy);

    let det = expansion_sum(
        &expansion_sum(&expansion_product(&alift, &bc), &expansion_product(&blift, &ca)),
        &expansion_product(&clift, &ab),
    );
    estimate(&det)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orient_signs() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        assert!(orient2d(a, b, Point::new(0.0, 1.0)) > 0.0);
        assert!(orient2d(a, b, Point::new(0.0, -1.0)) < 0.0);
        assert_eq!(orient2d(a, b, Point::new(2.0, 0.0)), 0.0);
    }

    #[test]
    fn orient_near_degenerate_is_exact() {
        // Points on the line y = x, nudged by one ulp.
        let a = Point::new(0.5, 0.5);
        let b = Point::new(12.0, 12.0);
        let c = Point::new(24.0, 24.0);
        assert_eq!(orient2d(a, b, c), 0.0);

        let up = Point::new(24.0, f64::from_bits(24.0f64.to_bits() + 1));
        assert!(orient2d(a, b, up) > 0.0);
        let down = Point::new(24.0, f64::from_bits(24.0f64.to_bits() - 1));
        assert!(orient2d(a, b, down) < 0.0);
    }

    #[test]
    fn incircle_signs() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(0.0, 1.0);
        assert!(incircle(a, b, c, Point::new(0.5, 0.5)) > 0.0);
        assert!(incircle(a, b, c, Point::new(2.0, 2.0)) < 0.0);
        // The fourth corner of the unit square is cocircular.
        assert_eq!(incircle(a, b, c, Point::new(1.0, 1.0)), 0.0);
    }

    #[test]
    fn incircle_cocircular_with_offset_is_exact() {
        let o = 1.0e6;
        let a = Point::new(o, o);
        let b = Point::new(o + 1.0, o);
        let c = Point::new(o + 1.0, o + 1.0);
        let d = Point::new(o, o + 1.0);
        assert_eq!(incircle(a, b, c, d), 0.0);
        let inside = Point::new(o, o + 1.0 - 1.0e-9);
        assert!(incircle(a, b, c, inside) > 0.0);
    }

    #[test]
    fn expansions_sum_exactly() {
        let e = grow_expansion(&[1.0e-30], 1.0);
        assert_eq!(e, vec![1.0e-30, 1.0]);
        let p = expansion_product(&[3.0], &[1.0e-20, 1.0]);
        assert_eq!(estimate(&p), 3.0 + 3.0e-20);
    }
}
