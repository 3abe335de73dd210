// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Output polygon records. Each contributing edge appends to an OutRec, a
// circular list of OutPts. Records merge when bounds meet, joins stitch
// collinear touching edges back together, and a final fixup pass strips
// duplicate and collinear points before the result is collected.

use super::{Clipper, OutPtIdx, OutRecIdx};
use crate::geom::{
    area, orient_by_nesting, pt2_is_between_pt1_and_pt3, slopes_equal3, slopes_equal4, IntPoint,
    Paths, HORIZONTAL,
};
use crate::sweep::{Direction, EdgeIdx, EdgeSide, INVALID, UNASSIGNED};

#[derive(Clone, Debug)]
pub(crate) struct OutRec {
    /// Points at itself until merged into another record.
    pub idx: OutRecIdx,
    pub is_hole: bool,
    pub first_left: OutRecIdx,
    pub pts: OutPtIdx,
    pub bottom_pt: OutPtIdx,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct OutPt {
    pub idx: OutRecIdx,
    pub pt: IntPoint,
    pub next: OutPtIdx,
    pub prev: OutPtIdx,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Join {
    pub out_pt1: OutPtIdx,
    pub out_pt2: OutPtIdx,
    pub off_pt: IntPoint,
}

fn get_dx(pt1: IntPoint, pt2: IntPoint) -> f64 {
    if pt1.y == pt2.y {
        HORIZONTAL
    } else {
        (pt2.x - pt1.x) as f64 / (pt2.y - pt1.y) as f64
    }
}

pub(crate) fn horz_segments_overlap(seg1a: i64, seg1b: i64, seg2a: i64, seg2b: i64) -> bool {
    let (seg1a, seg1b) = if seg1a > seg1b { (seg1b, seg1a) } else { (seg1a, seg1b) };
    let (seg2a, seg2b) = if seg2a > seg2b { (seg2b, seg2a) } else { (seg2a, seg2b) };
    seg1a < seg2b && seg2a < seg1b
}

fn get_overlap(a1: i64, a2: i64, b1: i64, b2: i64) -> Option<(i64, i64)> {
    let (left, right) = if a1 < a2 {
        if b1 < b2 {
            (a1.max(b1), a2.min(b2))
        } else {
            (a1.max(b2), a2.min(b1))
        }
    } else if b1 < b2 {
        (a2.max(b1), a1.min(b2))
    } else {
        (a2.max(b2), a1.min(b1))
    };
    (left < right).then_some((left, right))
}

impl Clipper {
    #[inline]
    fn op(&self, i: OutPtIdx) -> &OutPt {
        &self.out_pts[i as usize]
    }

    #[inline]
    fn op_mut(&mut self, i: OutPtIdx) -> &mut OutPt {
        &mut self.out_pts[i as usize]
    }

    #[inline]
    fn rec(&self, i: OutRecIdx) -> &OutRec {
        &self.out_recs[i as usize]
    }

    #[inline]
    fn rec_mut(&mut self, i: OutRecIdx) -> &mut OutRec {
        &mut self.out_recs[i as usize]
    }

    fn create_out_rec(&mut self) -> OutRecIdx {
        let idx = self.out_recs.len() as OutRecIdx;
        self.out_recs.push(OutRec {
            idx,
            is_hole: false,
            first_left: INVALID,
            pts: INVALID,
            bottom_pt: INVALID,
        });
        idx
    }

    fn new_out_pt(&mut self, rec: OutRecIdx, pt: IntPoint) -> OutPtIdx {
        let idx = self.out_pts.len() as OutPtIdx;
        self.out_pts.push(OutPt {
            idx: rec,
            pt,
            next: idx,
            prev: idx,
        });
        idx
    }

    pub(crate) fn dispose_out_recs(&mut self) {
        self.out_recs.clear();
        self.out_pts.clear();
        self.joins.clear();
        self.ghost_joins.clear();
    }

    pub(crate) fn add_out_pt(&mut self, e: EdgeIdx, pt: IntPoint) -> OutPtIdx {
        if self.edge(e).out_idx < 0 {
            let rec = self.create_out_rec();
            let op = self.new_out_pt(rec, pt);
            self.rec_mut(rec).pts = op;
            self.set_hole_state(e, rec);
            self.edge_mut(e).out_idx = rec as i32;
            return op;
        }
        let rec = self.edge(e).out_idx as OutRecIdx;
        let op = self.rec(rec).pts;
        let to_front = self.edge(e).side == EdgeSide::Left;
        if to_front && pt == self.op(op).pt {
            return op;
        }
        let back = self.op(op).prev;
        if !to_front && pt == self.op(back).pt {
            return back;
        }
        let new_op = self.new_out_pt(rec, pt);
        self.op_mut(new_op).next = op;
        self.op_mut(new_op).prev = back;
        self.op_mut(back).next = new_op;
        self.op_mut(op).prev = new_op;
        if to_front {
            self.rec_mut(rec).pts = new_op;
        }
        new_op
    }

    pub(crate) fn get_last_out_pt(&self, e: EdgeIdx) -> OutPtIdx {
        let rec = self.rec(self.edge(e).out_idx as OutRecIdx);
        if self.edge(e).side == EdgeSide::Left {
            rec.pts
        } else {
            self.op(rec.pts).prev
        }
    }

    /// A new record is a hole when an odd number of distinct outputs lie to its left.
    fn set_hole_state(&mut self, e: EdgeIdx, rec: OutRecIdx) {
        let mut e2 = self.prev_in_ael(e);
        let mut e_tmp = INVALID;
        while e2 != INVALID {
            if self.edge(e2).out_idx >= 0 && self.edge(e2).wind_delta != 0 {
                if e_tmp == INVALID {
                    e_tmp = e2;
                } else if self.edge(e_tmp).out_idx == self.edge(e2).out_idx {
                    // Both sides of the same output: it does not enclose us.
                    e_tmp = INVALID;
                }
            }
            e2 = self.prev_in_ael(e2);
        }
        if e_tmp == INVALID {
            let r = self.rec_mut(rec);
            r.first_left = INVALID;
            r.is_hole = false;
        } else {
            let fl = self.edge(e_tmp).out_idx as OutRecIdx;
            let hole = !self.rec(fl).is_hole;
            let r = self.rec_mut(rec);
            r.first_left = fl;
            r.is_hole = hole;
        }
    }

    pub(crate) fn add_local_min_poly(&mut self, e1: EdgeIdx, e2: EdgeIdx, pt: IntPoint) -> OutPtIdx {
        let (e, prev_e, result);
        if self.edge(e2).is_horizontal() || self.edge(e1).dx > self.edge(e2).dx {
            result = self.add_out_pt(e1, pt);
            self.edge_mut(e2).out_idx = self.edge(e1).out_idx;
            self.edge_mut(e1).side = EdgeSide::Left;
            self.edge_mut(e2).side = EdgeSide::Right;
            e = e1;
            prev_e = if self.prev_in_ael(e) == e2 {
                self.prev_in_ael(e2)
            } else {
                self.prev_in_ael(e)
            };
        } else {
            result = self.add_out_pt(e2, pt);
            self.edge_mut(e1).out_idx = self.edge(e2).out_idx;
            self.edge_mut(e1).side = EdgeSide::Right;
            self.edge_mut(e2).side = EdgeSide::Left;
            e = e2;
            prev_e = if self.prev_in_ael(e) == e1 {
                self.prev_in_ael(e1)
            } else {
                self.prev_in_ael(e)
            };
        }

        if prev_e != INVALID && self.edge(prev_e).out_idx >= 0 {
            let y = pt.y;
            let x_prev = self.edge(prev_e).top_x(y);
            let x_e = self.edge(e).top_x(y);
            let (pe, ee) = (self.edge(prev_e), self.edge(e));
            if x_prev == x_e
                && ee.wind_delta != 0
                && pe.wind_delta != 0
                && slopes_equal4(IntPoint::new(x_prev, y), pe.top, IntPoint::new(x_e, y), ee.top)
            {
                let top = ee.top;
                let op = self.add_out_pt(prev_e, pt);
                self.add_join(result, op, top);
            }
        }
        result
    }

    pub(crate) fn add_local_max_poly(&mut self, e1: EdgeIdx, e2: EdgeIdx, pt: IntPoint) {
        self.add_out_pt(e1, pt);
        if self.edge(e2).wind_delta == 0 {
            self.add_out_pt(e2, pt);
        }
        if self.edge(e1).out_idx == self.edge(e2).out_idx {
            self.edge_mut(e1).out_idx = UNASSIGNED;
            self.edge_mut(e2).out_idx = UNASSIGNED;
        } else if self.edge(e1).out_idx < self.edge(e2).out_idx {
            self.append_polygon(e1, e2);
        } else {
            self.append_polygon(e2, e1);
        }
    }

    pub(crate) fn add_join(&mut self, out_pt1: OutPtIdx, out_pt2: OutPtIdx, off_pt: IntPoint) {
        self.joins.push(Join {
            out_pt1,
            out_pt2,
            off_pt,
        });
    }

    pub(crate) fn add_ghost_join(&mut self, op: OutPtIdx, off_pt: IntPoint) {
        self.ghost_joins.push(Join {
            out_pt1: op,
            out_pt2: INVALID,
            off_pt,
        });
    }

    fn get_bottom_pt(&self, mut pp: OutPtIdx) -> OutPtIdx {
        let mut dups = INVALID;
        let mut p = self.op(pp).next;
        while p != pp {
            let (pt, best) = (self.op(p).pt, self.op(pp).pt);
            if pt.y > best.y {
                pp = p;
                dups = INVALID;
            } else if pt.y == best.y && pt.x <= best.x {
                if pt.x < best.x {
                    dups = INVALID;
                    pp = p;
                } else if self.op(p).next != pp && self.op(p).prev != pp {
                    dups = p;
                }
            }
            p = self.op(p).next;
        }
        if dups != INVALID {
            // Several vertices share the bottom point: pick the one with the
            // most open angle.
            while dups != p {
                if !self.first_is_bottom_pt(p, dups) {
                    pp = dups;
                }
                dups = self.op(dups).next;
                while self.op(dups).pt != self.op(pp).pt {
                    dups = self.op(dups).next;
                }
            }
        }
        pp
    }

    fn first_is_bottom_pt(&self, btm_pt1: OutPtIdx, btm_pt2: OutPtIdx) -> bool {
        let spread = |btm: OutPtIdx| -> (f64, f64) {
            let pt = self.op(btm).pt;
            let mut p = self.op(btm).prev;
            while self.op(p).pt == pt && p != btm {
                p = self.op(p).prev;
            }
            let dx_prev = get_dx(pt, self.op(p).pt).abs();
            p = self.op(btm).next;
            while self.op(p).pt == pt && p != btm {
                p = self.op(p).next;
            }
            let dx_next = get_dx(pt, self.op(p).pt).abs();
            (dx_prev, dx_next)
        };
        let (dx1p, dx1n) = spread(btm_pt1);
        let (dx2p, dx2n) = spread(btm_pt2);
        if dx1p.max(dx1n) == dx2p.max(dx2n) && dx1p.min(dx1n) == dx2p.min(dx2n) {
            self.out_area(btm_pt1) > 0.0
        } else {
            (dx1p >= dx2p && dx1p >= dx2n) || (dx1n >= dx2p && dx1n >= dx2n)
        }
    }

    fn get_lowermost_rec(&mut self, r1: OutRecIdx, r2: OutRecIdx) -> OutRecIdx {
        if self.rec(r1).bottom_pt == INVALID {
            let b = self.get_bottom_pt(self.rec(r1).pts);
            self.rec_mut(r1).bottom_pt = b;
        }
        if self.rec(r2).bottom_pt == INVALID {
            let b = self.get_bottom_pt(self.rec(r2).pts);
            self.rec_mut(r2).bottom_pt = b;
        }
        let (b1, b2) = (self.rec(r1).bottom_pt, self.rec(r2).bottom_pt);
        let (p1, p2) = (self.op(b1).pt, self.op(b2).pt);
        if p1.y > p2.y {
            r1
        } else if p1.y < p2.y {
            r2
        } else if p1.x < p2.x {
            r1
        } else if p1.x > p2.x {
            r2
        } else if self.op(b1).next == b1 {
            r2
        } else if self.op(b2).next == b2 || self.first_is_bottom_pt(b1, b2) {
            r1
        } else {
            r2
        }
    }

    /// True when `r2` appears in the FirstLeft chain of `r1`.
    fn outrec1_right_of_outrec2(&self, r1: OutRecIdx, r2: OutRecIdx) -> bool {
        let mut r = r1;
        for _ in 0..self.out_recs.len() {
            r = self.rec(r).first_left;
            if r == r2 {
                return true;
            }
            if r == INVALID {
                return false;
            }
        }
        false
    }

    fn get_out_rec(&self, idx: OutRecIdx) -> OutRecIdx {
        let mut r = idx;
        while r != self.rec(r).idx {
            r = self.rec(r).idx;
        }
        r
    }

    /// Merge the output of `e2` into the output of `e1` where the two meet at a maximum.
    fn append_polygon(&mut self, e1: EdgeIdx, e2: EdgeIdx) {
        let r1 = self.edge(e1).out_idx as OutRecIdx;
        let r2 = self.edge(e2).out_idx as OutRecIdx;

        let hole_state_rec = if self.outrec1_right_of_outrec2(r1, r2) {
            r2
        } else if self.outrec1_right_of_outrec2(r2, r1) {
            r1
        } else {
            self.get_lowermost_rec(r1, r2)
        };

        let p1_lft = self.rec(r1).pts;
        let p1_rt = self.op(p1_lft).prev;
        let p2_lft = self.rec(r2).pts;
        let p2_rt = self.op(p2_lft).prev;

        if self.edge(e1).side == EdgeSide::Left {
            if self.edge(e2).side == EdgeSide::Left {
                // z y x a b c
                self.reverse_poly_pt_links(p2_lft);
                self.op_mut(p2_lft).next = p1_lft;
                self.op_mut(p1_lft).prev = p2_lft;
                self.op_mut(p1_rt).next = p2_rt;
                self.op_mut(p2_rt).prev = p1_rt;
                self.rec_mut(r1).pts = p2_rt;
            } else {
                // x y z a b c
                self.op_mut(p2_rt).next = p1_lft;
                self.op_mut(p1_lft).prev = p2_rt;
                self.op_mut(p2_lft).prev = p1_rt;
                self.op_mut(p1_rt).next = p2_lft;
                self.rec_mut(r1).pts = p2_lft;
            }
        } else if self.edge(e2).side == EdgeSide::Right {
            // a b c z y x
            self.reverse_poly_pt_links(p2_lft);
            self.op_mut(p1_rt).next = p2_rt;
            self.op_mut(p2_rt).prev = p1_rt;
            self.op_mut(p2_lft).next = p1_lft;
            self.op_mut(p1_lft).prev = p2_lft;
        } else {
            // a b c x y z
            self.op_mut(p1_rt).next = p2_lft;
            self.op_mut(p2_lft).prev = p1_rt;
            self.op_mut(p1_lft).prev = p2_rt;
            self.op_mut(p2_rt).next = p1_lft;
        }

        self.rec_mut(r1).bottom_pt = INVALID;
        if hole_state_rec == r2 {
            if self.rec(r2).first_left != r1 {
                let fl = self.rec(r2).first_left;
                self.rec_mut(r1).first_left = fl;
            }
            let hole = self.rec(r2).is_hole;
            self.rec_mut(r1).is_hole = hole;
        }
        {
            let r = self.rec_mut(r2);
            r.pts = INVALID;
            r.bottom_pt = INVALID;
            r.first_left = r1;
        }

        let ok_idx = self.edge(e1).out_idx;
        let obsolete_idx = self.edge(e2).out_idx;
        self.edge_mut(e1).out_idx = UNASSIGNED;
        self.edge_mut(e2).out_idx = UNASSIGNED;

        let mut e = self.first_in_ael();
        while e != INVALID {
            if self.edge(e).out_idx == obsolete_idx {
                let side = self.edge(e1).side;
                let edge = self.edge_mut(e);
                edge.out_idx = ok_idx;
                edge.side = side;
                break;
            }
            e = self.next_in_ael(e);
        }
        self.rec_mut(r2).idx = r1;
    }

    pub(crate) fn reverse_poly_pt_links(&mut self, pp: OutPtIdx) {
        if pp == INVALID {
            return;
        }
        let mut p = pp;
        loop {
            let next = self.op(p).next;
            let prev = self.op(p).prev;
            self.op_mut(p).next = prev;
            self.op_mut(p).prev = next;
            p = next;
            if p == pp {
                break;
            }
        }
    }

    /// Twice the signed area of the ring walked along `next`, halved.
    pub(crate) fn out_area(&self, pts: OutPtIdx) -> f64 {
        if pts == INVALID {
            return 0.0;
        }
        let mut a = 0.0f64;
        let mut op = pts;
        loop {
            let prev = self.op(self.op(op).prev).pt;
            let pt = self.op(op).pt;
            a += (prev.x as f64 + pt.x as f64) * (prev.y as f64 - pt.y as f64);
            op = self.op(op).next;
            if op == pts {
                break;
            }
        }
        a * 0.5
    }

    fn point_count(&self, pts: OutPtIdx) -> usize {
        if pts == INVALID {
            return 0;
        }
        let mut n = 0;
        let mut p = pts;
        loop {
            n += 1;
            p = self.op(p).next;
            if p == pts {
                break;
            }
        }
        n
    }

    /// Remove duplicate points and collinear spikes from a finished record.
    pub(crate) fn fixup_out_polygon(&mut self, rec: OutRecIdx) {
        let mut last_ok = INVALID;
        self.rec_mut(rec).bottom_pt = INVALID;
        let mut pp = self.rec(rec).pts;
        let preserve = self.options.preserve_collinear;
        loop {
            let (prev, next) = (self.op(pp).prev, self.op(pp).next);
            if prev == pp || prev == next {
                self.rec_mut(rec).pts = INVALID;
                return;
            }
            let (pt, ppt, npt) = (self.op(pp).pt, self.op(prev).pt, self.op(next).pt);
            if pt == npt
                || pt == ppt
                || (slopes_equal3(ppt, pt, npt)
                    && (!preserve || !pt2_is_between_pt1_and_pt3(ppt, pt, npt)))
            {
                last_ok = INVALID;
                self.op_mut(prev).next = next;
                self.op_mut(next).prev = prev;
                pp = prev;
                continue;
            }
            if pp == last_ok {
                break;
            }
            if last_ok == INVALID {
                last_ok = pp;
            }
            pp = next;
        }
        self.rec_mut(rec).pts = pp;
    }

    fn dup_out_pt(&mut self, op: OutPtIdx, insert_after: bool) -> OutPtIdx {
        let (rec, pt) = (self.op(op).idx, self.op(op).pt);
        let result = self.new_out_pt(rec, pt);
        if insert_after {
            let next = self.op(op).next;
            self.op_mut(result).next = next;
            self.op_mut(result).prev = op;
            self.op_mut(next).prev = result;
            self.op_mut(op).next = result;
        } else {
            let prev = self.op(op).prev;
            self.op_mut(result).prev = prev;
            self.op_mut(result).next = op;
            self.op_mut(prev).next = result;
            self.op_mut(op).prev = result;
        }
        result
    }

    /// Walk `op` along its horizontal run towards `pt` and leave a duplicated
    /// vertex at `pt`. Returns the pair that will be relinked.
    fn join_horz_end(
        &mut self,
        mut op: OutPtIdx,
        dir: Direction,
        pt: IntPoint,
        discard_left: bool,
    ) -> (OutPtIdx, OutPtIdx) {
        let after = match dir {
            Direction::LeftToRight => {
                loop {
                    let (cur, nxt) = (self.op(op).pt, self.op(self.op(op).next).pt);
                    if !(nxt.x <= pt.x && nxt.x >= cur.x && nxt.y == pt.y) {
                        break;
                    }
                    op = self.op(op).next;
                }
                if discard_left && self.op(op).pt.x != pt.x {
                    op = self.op(op).next;
                }
                !discard_left
            }
            Direction::RightToLeft => {
                loop {
                    let (cur, nxt) = (self.op(op).pt, self.op(self.op(op).next).pt);
                    if !(nxt.x >= pt.x && nxt.x <= cur.x && nxt.y == pt.y) {
                        break;
                    }
                    op = self.op(op).next;
                }
                if !discard_left && self.op(op).pt.x != pt.x {
                    op = self.op(op).next;
                }
                discard_left
            }
        };
        let mut opb = self.dup_out_pt(op, after);
        if self.op(opb).pt != pt {
            op = opb;
            self.op_mut(op).pt = pt;
            opb = self.dup_out_pt(op, after);
        }
        (op, opb)
    }

    /// Splice two overlapping horizontal runs of opposite direction at `pt`.
    fn join_horz(
        &mut self,
        op1: OutPtIdx,
        op1b: OutPtIdx,
        op2: OutPtIdx,
        op2b: OutPtIdx,
        pt: IntPoint,
        discard_left: bool,
    ) -> bool {
        let direction = |a: IntPoint, b: IntPoint| {
            if a.x > b.x {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            }
        };
        let dir1 = direction(self.op(op1).pt, self.op(op1b).pt);
        let dir2 = direction(self.op(op2).pt, self.op(op2b).pt);
        if dir1 == dir2 {
            return false;
        }
        let (op1, op1b) = self.join_horz_end(op1, dir1, pt, discard_left);
        let (op2, op2b) = self.join_horz_end(op2, dir2, pt, discard_left);

        if (dir1 == Direction::LeftToRight) == discard_left {
            self.op_mut(op1).prev = op2;
            self.op_mut(op2).next = op1;
            self.op_mut(op1b).next = op2b;
            self.op_mut(op2b).prev = op1b;
        } else {
            self.op_mut(op1).next = op2;
            self.op_mut(op2).prev = op1;
            self.op_mut(op1b).prev = op2b;
            self.op_mut(op2b).next = op1b;
        }
        true
    }

    fn join_points(&mut self, j: usize, r1: OutRecIdx, r2: OutRecIdx) -> bool {
        let Join {
            out_pt1: mut op1,
            out_pt2: mut op2,
            off_pt,
        } = self.joins[j];
        let is_horizontal = self.op(op1).pt.y == off_pt.y;

        if is_horizontal && off_pt == self.op(op1).pt && off_pt == self.op(op2).pt {
            // Strictly simple join: two rings touch at a single vertex.
            if r1 != r2 {
                return false;
            }
            let mut op1b = self.op(op1).next;
            while op1b != op1 && self.op(op1b).pt == off_pt {
                op1b = self.op(op1b).next;
            }
            let reverse1 = self.op(op1b).pt.y > off_pt.y;
            let mut op2b = self.op(op2).next;
            while op2b != op2 && self.op(op2b).pt == off_pt {
                op2b = self.op(op2b).next;
            }
            let reverse2 = self.op(op2b).pt.y > off_pt.y;
            if reverse1 == reverse2 {
                return false;
            }
            let op1b = self.dup_out_pt(op1, !reverse1);
            let op2b = self.dup_out_pt(op2, reverse1);
            if reverse1 {
                self.op_mut(op1).prev = op2;
                self.op_mut(op2).next = op1;
                self.op_mut(op1b).next = op2b;
                self.op_mut(op2b).prev = op1b;
            } else {
                self.op_mut(op1).next = op2;
                self.op_mut(op2).prev = op1;
                self.op_mut(op1b).prev = op2b;
                self.op_mut(op2b).next = op1b;
            }
            self.joins[j].out_pt1 = op1;
            self.joins[j].out_pt2 = op1b;
            return true;
        }

        if is_horizontal {
            // Expand both ends of each horizontal run.
            let mut op1b = op1;
            while self.op(self.op(op1).prev).pt.y == self.op(op1).pt.y
                && self.op(op1).prev != op1b
                && self.op(op1).prev != op2
            {
                op1 = self.op(op1).prev;
            }
            while self.op(self.op(op1b).next).pt.y == self.op(op1b).pt.y
                && self.op(op1b).next != op1
                && self.op(op1b).next != op2
            {
                op1b = self.op(op1b).next;
            }
            if self.op(op1b).next == op1 || self.op(op1b).next == op2 {
                return false;
            }
            let mut op2b = op2;
            while self.op(self.op(op2).prev).pt.y == self.op(op2).pt.y
                && self.op(op2).prev != op2b
                && self.op(op2).prev != op1b
            {
                op2 = self.op(op2).prev;
            }
            while self.op(self.op(op2b).next).pt.y == self.op(op2b).pt.y
                && self.op(op2b).next != op2
                && self.op(op2b).next != op1
            {
                op2b = self.op(op2b).next;
            }
            if self.op(op2b).next == op2 || self.op(op2b).next == op1 {
                return false;
            }

            let (l, r) = match get_overlap(
                self.op(op1).pt.x,
                self.op(op1b).pt.x,
                self.op(op2).pt.x,
                self.op(op2b).pt.x,
            ) {
                Some(lr) => lr,
                None => return false,
            };

            // Splice at a point of the overlap, preferring an existing vertex.
            let (pt, discard_left) = {
                let (p1, p1b, p2, p2b) = (
                    self.op(op1).pt,
                    self.op(op1b).pt,
                    self.op(op2).pt,
                    self.op(op2b).pt,
                );
                if p1.x >= l && p1.x <= r {
                    (p1, p1.x > p1b.x)
                } else if p2.x >= l && p2.x <= r {
                    (p2, p2.x > p2b.x)
                } else if p1b.x >= l && p1b.x <= r {
                    (p1b, p1b.x > p1.x)
                } else {
                    (p2b, p2b.x > p2.x)
                }
            };
            self.joins[j].out_pt1 = op1;
            self.joins[j].out_pt2 = op2;
            return self.join_horz(op1, op1b, op2, op2b, pt, discard_left);
        }

        // Non-horizontal: the two edges must be collinear through off_pt.
        let mut op1b = self.op(op1).next;
        while self.op(op1b).pt == self.op(op1).pt && op1b != op1 {
            op1b = self.op(op1b).next;
        }
        let reverse1 = self.op(op1b).pt.y > self.op(op1).pt.y
            || !slopes_equal3(self.op(op1).pt, self.op(op1b).pt, off_pt);
        if reverse1 {
            op1b = self.op(op1).prev;
            while self.op(op1b).pt == self.op(op1).pt && op1b != op1 {
                op1b = self.op(op1b).prev;
            }
            if self.op(op1b).pt.y > self.op(op1).pt.y
                || !slopes_equal3(self.op(op1).pt, self.op(op1b).pt, off_pt)
            {
                return false;
            }
        }
        let mut op2b = self.op(op2).next;
        while self.op(op2b).pt == self.op(op2).pt && op2b != op2 {
            op2b = self.op(op2b).next;
        }
        let reverse2 = self.op(op2b).pt.y > self.op(op2).pt.y
            || !slopes_equal3(self.op(op2).pt, self.op(op2b).pt, off_pt);
        if reverse2 {
            op2b = self.op(op2).prev;
            while self.op(op2b).pt == self.op(op2).pt && op2b != op2 {
                op2b = self.op(op2b).prev;
            }
            if self.op(op2b).pt.y > self.op(op2).pt.y
                || !slopes_equal3(self.op(op2).pt, self.op(op2b).pt, off_pt)
            {
                return false;
            }
        }
        if op1b == op1
            || op2b == op2
            || op1b == op2b
            || (r1 == r2 && reverse1 == reverse2)
        {
            return false;
        }
        let op1b = self.dup_out_pt(op1, !reverse1);
        let op2b = self.dup_out_pt(op2, reverse1);
        if reverse1 {
            self.op_mut(op1).prev = op2;
            self.op_mut(op2).next = op1;
            self.op_mut(op1b).next = op2b;
            self.op_mut(op2b).prev = op1b;
        } else {
            self.op_mut(op1).next = op2;
            self.op_mut(op2).prev = op1;
            self.op_mut(op1b).prev = op2b;
            self.op_mut(op2b).next = op1b;
        }
        self.joins[j].out_pt1 = op1;
        self.joins[j].out_pt2 = op1b;
        true
    }

    fn update_out_pt_idxs(&mut self, rec: OutRecIdx) {
        let start = self.rec(rec).pts;
        let mut op = start;
        loop {
            self.op_mut(op).idx = rec;
            op = self.op(op).prev;
            if op == start {
                break;
            }
        }
    }

    /// 1 inside, 0 outside, -1 on the boundary.
    fn point_in_out_polygon(&self, pt: IntPoint, start: OutPtIdx) -> i32 {
        let mut result = 0;
        let mut op = start;
        let (ptx, pty) = (pt.x as i128, pt.y as i128);
        let mut poly0 = self.op(op).pt;
        loop {
            op = self.op(op).next;
            let poly1 = self.op(op).pt;
            let (x0, y0, x1, y1) = (
                poly0.x as i128,
                poly0.y as i128,
                poly1.x as i128,
                poly1.y as i128,
            );
            if y1 == pty && (x1 == ptx || (y0 == pty && ((x1 > ptx) == (x0 < ptx)))) {
                return -1;
            }
            if (y0 < pty) != (y1 < pty) {
                if x0 >= ptx {
                    if x1 > ptx {
                        result = 1 - result;
                    } else {
                        let d = (x0 - ptx) * (y1 - pty) - (x1 - ptx) * (y0 - pty);
                        if d == 0 {
                            return -1;
                        }
                        if (d > 0) == (y1 > y0) {
                            result = 1 - result;
                        }
                    }
                } else if x1 > ptx {
                    let d = (x0 - ptx) * (y1 - pty) - (x1 - ptx) * (y0 - pty);
                    if d == 0 {
                        return -1;
                    }
                    if (d > 0) == (y1 > y0) {
                        result = 1 - result;
                    }
                }
            }
            poly0 = poly1;
            if op == start {
                break;
            }
        }
        result
    }

    /// True when ring `p1` lies inside ring `p2`. Only a larger ring can
    /// contain a smaller one; vertices on the boundary of `p2` abstain.
    fn poly2_contains_poly1(&self, p1: OutPtIdx, p2: OutPtIdx) -> bool {
        if self.out_area(p1).abs() >= self.out_area(p2).abs() {
            return false;
        }
        let mut outside = 0i32;
        let mut op = p1;
        loop {
            match self.point_in_out_polygon(self.op(op).pt, p2) {
                0 => outside += 1,
                1 => outside -= 1,
                _ => {}
            }
            if outside.abs() > 1 {
                return outside < 0;
            }
            op = self.op(op).next;
            if op == p1 {
                break;
            }
        }
        outside <= 0
    }

    pub(crate) fn join_common_edges(&mut self) {
        for j in 0..self.joins.len() {
            let join = self.joins[j];
            let r1 = self.get_out_rec(self.op(join.out_pt1).idx);
            let r2 = self.get_out_rec(self.op(join.out_pt2).idx);
            if self.rec(r1).pts == INVALID || self.rec(r2).pts == INVALID {
                continue;
            }
            let hole_state_rec = if r1 == r2 {
                r1
            } else if self.outrec1_right_of_outrec2(r1, r2) {
                r2
            } else if self.outrec1_right_of_outrec2(r2, r1) {
                r1
            } else {
                self.get_lowermost_rec(r1, r2)
            };

            if !self.join_points(j, r1, r2) {
                continue;
            }
            let join = self.joins[j];

            if r1 == r2 {
                // One ring was split in two.
                self.rec_mut(r1).pts = join.out_pt1;
                self.rec_mut(r1).bottom_pt = INVALID;
                let r2 = self.create_out_rec();
                self.rec_mut(r2).pts = join.out_pt2;
                self.update_out_pt_idxs(r2);

                let reverse = self.options.reverse_solution;
                if self.poly2_contains_poly1(self.rec(r2).pts, self.rec(r1).pts) {
                    let hole = !self.rec(r1).is_hole;
                    self.rec_mut(r2).is_hole = hole;
                    self.rec_mut(r2).first_left = r1;
                    if (hole ^ reverse) == (self.out_area(self.rec(r2).pts) > 0.0) {
                        self.reverse_poly_pt_links(self.rec(r2).pts);
                    }
                } else if self.poly2_contains_poly1(self.rec(r1).pts, self.rec(r2).pts) {
                    let r2_hole = self.rec(r1).is_hole;
                    let r1_fl = self.rec(r1).first_left;
                    self.rec_mut(r2).is_hole = r2_hole;
                    self.rec_mut(r1).is_hole = !r2_hole;
                    self.rec_mut(r2).first_left = r1_fl;
                    self.rec_mut(r1).first_left = r2;
                    if (!r2_hole ^ reverse) == (self.out_area(self.rec(r1).pts) > 0.0) {
                        self.reverse_poly_pt_links(self.rec(r1).pts);
                    }
                } else {
                    // Side by side: each half keeps the state its winding says.
                    for r in [r1, r2] {
                        let hole = (self.out_area(self.rec(r).pts) > 0.0) == reverse;
                        self.rec_mut(r).is_hole = hole;
                    }
                    let fl = self.rec(r1).first_left;
                    self.rec_mut(r2).first_left = fl;
                }
            } else {
                // Two rings became one.
                let r1_idx = self.rec(r1).idx;
                let hole = self.rec(hole_state_rec).is_hole;
                {
                    let r = self.rec_mut(r2);
                    r.pts = INVALID;
                    r.bottom_pt = INVALID;
                    r.idx = r1_idx;
                }
                self.rec_mut(r1).is_hole = hole;
                if hole_state_rec == r2 {
                    let fl = self.rec(r2).first_left;
                    self.rec_mut(r1).first_left = fl;
                }
                self.rec_mut(r2).first_left = r1;
            }
        }
    }

    /// Collect finished rings, walking `prev` so outers come out counter-clockwise.
    ///
    /// Hole state tracked during the sweep can go stale when joins split a
    /// ring, so orientation is settled last from how the rings nest.
    pub(crate) fn build_result(&self) -> Paths {
        let mut out = Vec::with_capacity(self.out_recs.len());
        for rec in &self.out_recs {
            if rec.pts == INVALID {
                continue;
            }
            let cnt = self.point_count(rec.pts);
            if cnt < 3 {
                continue;
            }
            let mut p = self.op(rec.pts).prev;
            let mut path = Vec::with_capacity(cnt);
            for _ in 0..cnt {
                path.push(self.op(p).pt);
                p = self.op(p).prev;
            }
            if area(&path) == 0.0 {
                continue;
            }
            out.push(path);
        }
        orient_by_nesting(&mut out, self.options.reverse_solution);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_ordered_and_strict() {
        assert_eq!(get_overlap(0, 10, 5, 20), Some((5, 10)));
        assert_eq!(get_overlap(10, 0, 20, 5), Some((5, 10)));
        assert_eq!(get_overlap(0, 5, 5, 10), None);
    }

    #[test]
    fn horizontal_overlap_ignores_direction() {
        assert!(horz_segments_overlap(0, 10, 9, 3));
        assert!(!horz_segments_overlap(0, 3, 3, 9));
    }
}
