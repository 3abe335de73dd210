// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Grid splitting of region boundaries. Neighbouring tiles share grid lines,
// so putting a vertex wherever a boundary crosses one lets their meshes and
// contours meet at the same points.

/// Regular grid anchored at `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Grid {
    pub origin: [f64; 2],
    pub spacing: f64,
}

impl Grid {
    /// Parameters in (0, 1) where a->b crosses a grid line along `axis`.
    fn crossings(&self, a: [f64; 2], b: [f64; 2], axis: usize, out: &mut Vec<f64>) {
        let (lo, hi) = (a[axis].min(b[axis]), a[axis].max(b[axis]));
        if hi - lo <= 0.0 {
            return;
        }
        let o = self.origin[axis];
        let first = ((lo - o) / self.spacing).floor() as i64 + 1;
        let mut k = first;
        loop {
            let line = o + k as f64 * self.spacing;
            if line >= hi {
                break;
            }
            if line > lo {
                out.push((line - a[axis]) / (b[axis] - a[axis]));
            }
            k += 1;
        }
    }
}

/// The ring with a vertex added at every grid crossing. The ring is taken
/// as implicitly closed and comes back the same way.
pub(crate) fn split_ring(ring: &[[f64; 2]], grid: &Grid) -> Vec<[f64; 2]> {
    let n = ring.len();
    let mut out = Vec::with_capacity(n * 2);
    let mut ts: Vec<f64> = Vec::new();
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        out.push(a);
        ts.clear();
        grid.crossings(a, b, 0, &mut ts);
        grid.crossings(a, b, 1, &mut ts);
        ts.sort_by(f64::total_cmp);
        // A crossing through a grid node shows up on both axes.
        ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
        for &t in &ts {
            let p = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
            if out.last() != Some(&p) && p != b {
                out.push(p);
            }
        }
    }
    out
}

/// Explicitly closed copy of a ring.
pub(crate) fn closed(ring: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut out = ring.to_vec();
    if let Some(&first) = ring.first() {
        if ring.last() != Some(&first) {
            out.push(first);
        }
    }
    out
}
