// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Path intake: each closed path becomes a ring of edges, split into bounds
// that rise monotonically from local minima. Bounds are linked through
// `next_in_lml` and seeded into the sweep from `Clipper::minima`.

use log::{debug, trace};

use super::Clipper;
use crate::error::ClipError;
use crate::geom::{pt2_is_between_pt1_and_pt3, range_test, slopes_equal3, IntPoint};
use crate::sweep::{ClipEdge, EdgeIdx, EdgeSide, LocalMinimum, PolyType, INVALID, UNASSIGNED};

impl Clipper {
    /// Add one closed path. Rejected paths leave the clipper unchanged.
    pub fn add_path(
        &mut self,
        path: &[IntPoint],
        poly_type: PolyType,
        closed: bool,
    ) -> Result<(), ClipError> {
        if !closed {
            return Err(ClipError::OpenPathUnsupported);
        }
        let edge_base = self.edges.len();
        let minima_base = self.minima.len();
        let result = self.add_ring(path, poly_type);
        if result.is_err() {
            self.edges.truncate(edge_base);
            self.minima.truncate(minima_base);
        }
        result
    }

    /// Add every path, collecting rejections instead of stopping at the first.
    /// Only an internal failure aborts the batch.
    pub fn add_paths(
        &mut self,
        paths: &[Vec<IntPoint>],
        poly_type: PolyType,
        closed: bool,
    ) -> Result<Vec<(usize, ClipError)>, ClipError> {
        let mut rejected = Vec::new();
        for (i, path) in paths.iter().enumerate() {
            match self.add_path(path, poly_type, closed) {
                Ok(()) => {}
                Err(e) if e.is_internal() => return Err(e),
                Err(e) => {
                    trace!("path {} rejected: {}", i, e);
                    rejected.push((i, e));
                }
            }
        }
        if !rejected.is_empty() {
            debug!(
                "{} of {} {:?} paths rejected",
                rejected.len(),
                paths.len(),
                poly_type
            );
        }
        Ok(rejected)
    }

    fn add_ring(&mut self, path: &[IntPoint], poly_type: PolyType) -> Result<(), ClipError> {
        // Trailing duplicates of the first vertex and repeated vertices at the end.
        let mut high = path.len();
        while high > 1 && path[high - 1] == path[0] {
            high -= 1;
        }
        while high > 1 && path[high - 1] == path[high - 2] {
            high -= 1;
        }
        if high < 3 {
            return Err(ClipError::TooFewVertices(high));
        }
        for pt in &path[..high] {
            range_test(*pt)?;
        }

        let base = self.edges.len() as EdgeIdx;
        let n = high as EdgeIdx;
        for i in 0..n {
            self.edges.push(ClipEdge {
                curr: path[i as usize],
                next: base + (i + 1) % n,
                prev: base + (i + n - 1) % n,
                out_idx: UNASSIGNED,
                ..Default::default()
            });
        }

        // Remove duplicate vertices and collinear runs (spikes always go).
        let mut e_start = base;
        let mut e = base;
        let mut e_loop_stop = base;
        loop {
            let e_next = self.edge(e).next;
            if self.edge(e).curr == self.edge(e_next).curr {
                if e == e_next {
                    break;
                }
                if e == e_start {
                    e_start = e_next;
                }
                e = self.remove_edge(e);
                e_loop_stop = e;
                continue;
            }
            let e_prev = self.edge(e).prev;
            if e_prev == e_next {
                break;
            }
            let (p, c, nx) = (
                self.edge(e_prev).curr,
                self.edge(e).curr,
                self.edge(e_next).curr,
            );
            if slopes_equal3(p, c, nx)
                && (!self.options.preserve_collinear || !pt2_is_between_pt1_and_pt3(p, c, nx))
            {
                if e == e_start {
                    e_start = e_next;
                }
                e = self.remove_edge(e);
                e = self.edge(e).prev;
                e_loop_stop = e;
                continue;
            }
            e = e_next;
            if e == e_loop_stop {
                break;
            }
        }
        if self.edge(e).prev == self.edge(e).next {
            let remaining = if self.edge(e).next == e { 1 } else { 2 };
            return Err(ClipError::TooFewVertices(remaining));
        }

        let ring_len = self.ring_len(e_start);
        let mut is_flat = true;
        let start_y = self.edge(e_start).curr.y;
        e = e_start;
        loop {
            let next = self.edge(e).next;
            let next_curr = self.edge(next).curr;
            self.edge_mut(e).init_bounds(next_curr, poly_type);
            e = next;
            if is_flat && self.edge(e).curr.y != start_y {
                is_flat = false;
            }
            if e == e_start {
                break;
            }
        }
        if is_flat {
            return Err(ClipError::ZeroArea);
        }

        // Split the ring into bounds.
        let prev = self.edge(e).prev;
        if self.edge(prev).bot == self.edge(prev).top {
            e = self.edge(e).next;
        }
        let mut e_min = INVALID;
        let mut guard = 0;
        loop {
            e = self.find_next_loc_min(e, ring_len)?;
            if e == e_min {
                break;
            }
            if e_min == INVALID {
                e_min = e;
            }
            let prev = self.edge(e).prev;
            let (lb, rb, left_is_forward) = if self.edge(e).dx < self.edge(prev).dx {
                (prev, e, false)
            } else {
                (e, prev, true)
            };
            let min_y = self.edge(e).bot.y;
            {
                let lb_wind = if self.edge(lb).next == rb { -1 } else { 1 };
                let l = self.edge_mut(lb);
                l.side = EdgeSide::Left;
                l.wind_delta = lb_wind;
                let r = self.edge_mut(rb);
                r.side = EdgeSide::Right;
                r.wind_delta = -lb_wind;
            }
            if self.edge(lb).bot == self.edge(lb).top && self.edge(rb).bot == self.edge(rb).top {
                let pt = self.edge(lb).bot;
                return Err(ClipError::Internal(format!(
                    "both bounds collapse at local minimum ({}, {})",
                    pt.x, pt.y
                )));
            }
            let next_lb = self.process_bound(lb, left_is_forward);
            let next_rb = self.process_bound(rb, !left_is_forward);
            self.minima.push(LocalMinimum {
                y: min_y,
                left_bound: lb,
                right_bound: rb,
            });
            self.minima_sorted = false;
            e = if left_is_forward { next_lb } else { next_rb };

            guard += 1;
            if guard > ring_len + 1 {
                return Err(ClipError::Internal(
                    "local minima search did not return to its start".into(),
                ));
            }
        }
        Ok(())
    }

    fn ring_len(&self, start: EdgeIdx) -> usize {
        let mut n = 1;
        let mut e = self.edge(start).next;
        while e != start {
            n += 1;
            e = self.edge(e).next;
        }
        n
    }

    /// Unlink `e` from its ring and return its successor.
    fn remove_edge(&mut self, e: EdgeIdx) -> EdgeIdx {
        let (prev, next) = (self.edge(e).prev, self.edge(e).next);
        self.edge_mut(prev).next = next;
        self.edge_mut(next).prev = prev;
        self.edge_mut(e).prev = INVALID;
        next
    }

    fn find_next_loc_min(&self, mut e: EdgeIdx, ring_len: usize) -> Result<EdgeIdx, ClipError> {
        let stuck = || ClipError::Internal("no local minimum found on ring".into());
        loop {
            let mut steps = 0;
            while self.edge(e).bot != self.edge(self.edge(e).prev).bot
                || self.edge(e).curr == self.edge(e).top
            {
                e = self.edge(e).next;
                steps += 1;
                if steps > ring_len {
                    return Err(stuck());
                }
            }
            if !self.edge(e).is_horizontal() && !self.edge(self.edge(e).prev).is_horizontal() {
                break;
            }
            steps = 0;
            while self.edge(self.edge(e).prev).is_horizontal() {
                e = self.edge(e).prev;
                steps += 1;
                if steps > ring_len {
                    return Err(stuck());
                }
            }
            let e2 = e;
            while self.edge(e).is_horizontal() {
                e = self.edge(e).next;
                steps += 1;
                if steps > 2 * ring_len {
                    return Err(stuck());
                }
            }
            if self.edge(e).top.y == self.edge(self.edge(e).prev).bot.y {
                // A horizontal run that is just an intermediate step.
                continue;
            }
            if self.edge(self.edge(e2).prev).bot.x < self.edge(e).bot.x {
                e = e2;
            }
            break;
        }
        Ok(e)
    }

    /// Link one bound from `e` up to its maximum and return the edge past it.
    fn process_bound(&mut self, e: EdgeIdx, left_is_forward: bool) -> EdgeIdx {
        if self.edge(e).is_horizontal() {
            // Horizontals at a minimum must start at the bound's bottom.
            let e_start = if left_is_forward {
                self.edge(e).prev
            } else {
                self.edge(e).next
            };
            let bot_x = self.edge(e).bot.x;
            let reverse = if self.edge(e_start).is_horizontal() {
                self.edge(e_start).bot.x != bot_x && self.edge(e_start).top.x != bot_x
            } else {
                self.edge(e_start).bot.x != bot_x
            };
            if reverse {
                self.edge_mut(e).reverse_horizontal();
            }
        }

        let e_start = e;
        let mut e = e;
        let mut result = e;
        if left_is_forward {
            while self.edge(result).top.y == self.edge(self.edge(result).next).bot.y {
                result = self.edge(result).next;
            }
            if self.edge(result).is_horizontal() {
                // Stop short of a trailing horizontal that belongs to the next bound.
                let mut horz = result;
                while self.edge(self.edge(horz).prev).is_horizontal() {
                    horz = self.edge(horz).prev;
                }
                let horz_prev = self.edge(horz).prev;
                if self.edge(horz_prev).top.x > self.edge(self.edge(result).next).top.x {
                    result = horz_prev;
                }
            }
            while e != result {
                let next = self.edge(e).next;
                self.edge_mut(e).next_in_lml = next;
                self.orient_bound_horizontal(e, e_start, self.edge(e).prev);
                e = next;
            }
            self.orient_bound_horizontal(e, e_start, self.edge(e).prev);
            self.edge(result).next
        } else {
            while self.edge(result).top.y == self.edge(self.edge(result).prev).bot.y {
                result = self.edge(result).prev;
            }
            if self.edge(result).is_horizontal() {
                let mut horz = result;
                while self.edge(self.edge(horz).next).is_horizontal() {
                    horz = self.edge(horz).next;
                }
                let horz_next = self.edge(horz).next;
                if self.edge(horz_next).top.x >= self.edge(self.edge(result).prev).top.x {
                    result = horz_next;
                }
            }
            while e != result {
                let prev = self.edge(e).prev;
                self.edge_mut(e).next_in_lml = prev;
                self.orient_bound_horizontal(e, e_start, self.edge(e).next);
                e = prev;
            }
            self.orient_bound_horizontal(e, e_start, self.edge(e).next);
            self.edge(result).prev
        }
    }

    fn orient_bound_horizontal(&mut self, e: EdgeIdx, e_start: EdgeIdx, below: EdgeIdx) {
        if self.edge(e).is_horizontal()
            && e != e_start
            && self.edge(e).bot.x != self.edge(below).top.x
        {
            self.edge_mut(e).reverse_horizontal();
        }
    }

    /// Rewind the sweep state so the stored minima can be swept again.
    pub(crate) fn reset(&mut self) {
        if !self.minima_sorted {
            // Stable, so equal Ys keep insertion order.
            self.minima.sort_by(|a, b| b.y.cmp(&a.y));
            self.minima_sorted = true;
        }
        self.current_lm = 0;
        self.scanbeam.clear();
        for e in self.edges.iter_mut() {
            e.ael_node = INVALID;
            e.sel_node = INVALID;
        }
        for i in 0..self.minima.len() {
            let lm = self.minima[i];
            self.scanbeam.insert(lm.y);
            for b in [lm.left_bound, lm.right_bound] {
                let edge = self.edge_mut(b);
                edge.curr = edge.bot;
                edge.out_idx = UNASSIGNED;
            }
        }
        self.scanbeam.init();
        self.ael.clear();
        self.sel.clear();
    }
}
