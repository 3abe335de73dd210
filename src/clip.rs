// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Vatti-style polygon clipping over fixed-point coordinates.
//
// Paths are split into monotone bounds (build.rs). A sweep then runs from
// the largest Y down through every scanbeam, keeping the active edges in the
// AEL ordered by X. At each edge crossing the winding counts of both polygon
// sets decide, through the fill rules and the boolean operation, whether the
// crossing starts, extends or closes an output ring (output.rs).

mod build;
mod output;

#[cfg(test)]
mod tests;

use log::{debug, error, trace};

use crate::dict::{Dict, DICT_HEAD};
use crate::error::ClipError;
use crate::geom::{round, slopes_equal4, IntPoint, Paths};
use crate::priorityq::PriorityQ;
use crate::sweep::{
    ClipEdge, Direction, EdgeIdx, LocalMinimum, PolyType, INVALID, UNASSIGNED,
};

use output::{horz_segments_overlap, Join, OutPt, OutRec};

pub(crate) type OutPtIdx = u32;
pub(crate) type OutRecIdx = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum ClipType {
    Intersection,
    Union,
    Difference,
    Xor,
}

/// Which regions of a self-overlapping polygon set count as filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonZero,
    Positive,
    Negative,
}

impl FillRule {
    /// True when a winding count is inside under this rule.
    pub fn is_filled(self, winding: i32) -> bool {
        match self {
            FillRule::EvenOdd => winding % 2 != 0,
            FillRule::NonZero => winding != 0,
            FillRule::Positive => winding > 0,
            FillRule::Negative => winding < 0,
        }
    }
}

/// Knobs for a Clipper.
///
/// ```
/// use tilemesh::ClipOptions;
/// let opts = ClipOptions::default().with_reverse_solution(true);
/// assert!(opts.reverse_solution);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ClipOptions {
    /// Keep vertices that lie on a straight run between their neighbours.
    pub preserve_collinear: bool,
    /// Emit outers clockwise and holes counter-clockwise.
    pub reverse_solution: bool,
}

impl ClipOptions {
    pub fn with_preserve_collinear(mut self, preserve: bool) -> Self {
        self.preserve_collinear = preserve;
        self
    }

    pub fn with_reverse_solution(mut self, reverse: bool) -> Self {
        self.reverse_solution = reverse;
        self
    }
}

#[derive(Clone, Copy, Debug)]
struct IntersectNode {
    edge1: EdgeIdx,
    edge2: EdgeIdx,
    pt: IntPoint,
}

fn scanbeam_leq(a: &i64, b: &i64) -> bool {
    // Largest Y first.
    *a >= *b
}

/// True when `e2` belongs left of `e1` in the AEL at the current scanline.
fn e2_inserts_before_e1(e1: &ClipEdge, e2: &ClipEdge) -> bool {
    if e2.curr.x == e1.curr.x {
        if e2.top.y > e1.top.y {
            e2.top.x < e1.top_x(e2.top.y)
        } else {
            e1.top.x > e2.top_x(e1.top.y)
        }
    } else {
        e2.curr.x < e1.curr.x
    }
}

/// The polygon clipper. Add subject and clip paths, then execute one or
/// more boolean operations against them.
///
/// Outer rings come back counter-clockwise (positive area in a y-up frame)
/// and holes clockwise, unless `reverse_solution` is set.
pub struct Clipper {
    edges: Vec<ClipEdge>,
    minima: Vec<LocalMinimum>,
    minima_sorted: bool,
    current_lm: usize,
    scanbeam: PriorityQ<i64>,
    ael: Dict,
    sel: Dict,
    intersections: Vec<IntersectNode>,
    out_recs: Vec<OutRec>,
    out_pts: Vec<OutPt>,
    joins: Vec<Join>,
    ghost_joins: Vec<Join>,
    clip_type: ClipType,
    subj_fill: FillRule,
    clip_fill: FillRule,
    options: ClipOptions,
}

impl Default for Clipper {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipper {
    pub fn new() -> Self {
        Self::with_options(ClipOptions::default())
    }

    pub fn with_options(options: ClipOptions) -> Self {
        Clipper {
            edges: Vec::new(),
            minima: Vec::new(),
            minima_sorted: true,
            current_lm: 0,
            scanbeam: PriorityQ::new(scanbeam_leq),
            ael: Dict::new(),
            sel: Dict::new(),
            intersections: Vec::new(),
            out_recs: Vec::new(),
            out_pts: Vec::new(),
            joins: Vec::new(),
            ghost_joins: Vec::new(),
            clip_type: ClipType::Union,
            subj_fill: FillRule::EvenOdd,
            clip_fill: FillRule::EvenOdd,
            options,
        }
    }

    pub fn options(&self) -> ClipOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ClipOptions) {
        self.options = options;
    }

    /// Drop every stored path, keeping allocations for reuse.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.minima.clear();
        self.minima_sorted = true;
        self.current_lm = 0;
        self.scanbeam.clear();
        self.ael.clear();
        self.sel.clear();
        self.intersections.clear();
        self.dispose_out_recs();
    }

    /// True when no path has been accepted since the last clear.
    pub fn is_empty(&self) -> bool {
        self.minima.is_empty()
    }

    /// Run one boolean operation over the stored paths. The stored paths
    /// are kept, so several operations can be executed in a row.
    pub fn execute(
        &mut self,
        clip_type: ClipType,
        subj_fill: FillRule,
        clip_fill: FillRule,
    ) -> Result<Paths, ClipError> {
        self.clip_type = clip_type;
        self.subj_fill = subj_fill;
        self.clip_fill = clip_fill;
        let result = match self.execute_internal() {
            Ok(()) => {
                let paths = self.build_result();
                debug!(
                    "{:?} of {} edges produced {} rings",
                    clip_type,
                    self.edges.len(),
                    paths.len()
                );
                Ok(paths)
            }
            Err(e) => {
                error!("{:?} failed: {}", clip_type, e);
                Err(e)
            }
        };
        self.dispose_out_recs();
        self.intersections.clear();
        result
    }

    fn execute_internal(&mut self) -> Result<(), ClipError> {
        self.reset();
        let bot_y = match self.pop_scanbeam() {
            Some(y) => y,
            None => return Ok(()),
        };
        self.insert_local_minima_into_ael(bot_y)?;
        while let Some(top_y) = self.pop_scanbeam() {
            self.process_horizontals()?;
            self.ghost_joins.clear();
            self.process_intersections(top_y)?;
            self.process_edges_at_top_of_scanbeam(top_y)?;
            self.insert_local_minima_into_ael(top_y)?;
        }
        if self.current_lm < self.minima.len() {
            return Err(ClipError::Internal(
                "local minima left over after the sweep".into(),
            ));
        }

        let reverse = self.options.reverse_solution;
        for i in 0..self.out_recs.len() {
            let rec = &self.out_recs[i];
            if rec.pts == INVALID {
                continue;
            }
            let (pts, hole) = (rec.pts, rec.is_hole);
            if (hole ^ reverse) == (self.out_area(pts) > 0.0) {
                self.reverse_poly_pt_links(pts);
            }
        }
        self.join_common_edges();
        for i in 0..self.out_recs.len() {
            if self.out_recs[i].pts != INVALID {
                self.fixup_out_polygon(i as OutRecIdx);
            }
        }
        Ok(())
    }

    #[inline]
    fn edge(&self, e: EdgeIdx) -> &ClipEdge {
        &self.edges[e as usize]
    }

    #[inline]
    fn edge_mut(&mut self, e: EdgeIdx) -> &mut ClipEdge {
        &mut self.edges[e as usize]
    }

    // Scanbeam

    fn insert_scanbeam(&mut self, y: i64) {
        self.scanbeam.insert(y);
    }

    fn pop_scanbeam(&mut self) -> Option<i64> {
        let y = self.scanbeam.extract_min()?;
        while self.scanbeam.minimum() == Some(y) {
            self.scanbeam.extract_min();
        }
        Some(y)
    }

    fn pop_local_minima(&mut self, y: i64) -> Option<LocalMinimum> {
        let lm = *self.minima.get(self.current_lm)?;
        if lm.y != y {
            return None;
        }
        self.current_lm += 1;
        Some(lm)
    }

    // AEL / SEL

    fn first_in_ael(&self) -> EdgeIdx {
        if self.ael.is_empty() {
            INVALID
        } else {
            self.ael.key(self.ael.min())
        }
    }

    fn next_in_ael(&self, e: EdgeIdx) -> EdgeIdx {
        let node = self.edge(e).ael_node;
        if node == INVALID {
            return INVALID;
        }
        let n = self.ael.succ(node);
        if n == DICT_HEAD {
            INVALID
        } else {
            self.ael.key(n)
        }
    }

    fn prev_in_ael(&self, e: EdgeIdx) -> EdgeIdx {
        let node = self.edge(e).ael_node;
        if node == INVALID {
            return INVALID;
        }
        let n = self.ael.pred(node);
        if n == DICT_HEAD {
            INVALID
        } else {
            self.ael.key(n)
        }
    }

    fn first_in_sel(&self) -> EdgeIdx {
        if self.sel.is_empty() {
            INVALID
        } else {
            self.sel.key(self.sel.min())
        }
    }

    fn next_in_sel(&self, e: EdgeIdx) -> EdgeIdx {
        let node = self.edge(e).sel_node;
        if node == INVALID {
            return INVALID;
        }
        let n = self.sel.succ(node);
        if n == DICT_HEAD {
            INVALID
        } else {
            self.sel.key(n)
        }
    }

    fn prev_in_sel(&self, e: EdgeIdx) -> EdgeIdx {
        let node = self.edge(e).sel_node;
        if node == INVALID {
            return INVALID;
        }
        let n = self.sel.pred(node);
        if n == DICT_HEAD {
            INVALID
        } else {
            self.sel.key(n)
        }
    }

    fn insert_edge_into_ael(&mut self, e: EdgeIdx, start: EdgeIdx) {
        let start_node = if start == INVALID {
            DICT_HEAD
        } else {
            self.edge(start).ael_node
        };
        let edges = &self.edges;
        let node = self.ael.insert_from(start_node, e, |existing, key| {
            e2_inserts_before_e1(&edges[existing as usize], &edges[key as usize])
        });
        self.edge_mut(e).ael_node = node;
    }

    fn delete_from_ael(&mut self, e: EdgeIdx) {
        let node = self.edge(e).ael_node;
        if node == INVALID {
            return;
        }
        self.ael.delete(node);
        self.edge_mut(e).ael_node = INVALID;
    }

    fn swap_positions_in_ael(&mut self, e1: EdgeIdx, e2: EdgeIdx) {
        let (n1, n2) = (self.edge(e1).ael_node, self.edge(e2).ael_node);
        if n1 == INVALID || n2 == INVALID || n1 == n2 {
            return;
        }
        self.ael.swap_keys(n1, n2);
        self.edge_mut(e1).ael_node = n2;
        self.edge_mut(e2).ael_node = n1;
    }

    fn add_edge_to_sel(&mut self, e: EdgeIdx) {
        let node = self.sel.link_after(DICT_HEAD, e);
        self.edge_mut(e).sel_node = node;
    }

    fn pop_edge_from_sel(&mut self) -> Option<EdgeIdx> {
        if self.sel.is_empty() {
            return None;
        }
        let node = self.sel.min();
        let e = self.sel.key(node);
        self.sel.delete(node);
        self.edge_mut(e).sel_node = INVALID;
        Some(e)
    }

    fn clear_sel(&mut self) {
        for e in self.sel.keys() {
            self.edges[e as usize].sel_node = INVALID;
        }
        self.sel.clear();
    }

    fn copy_ael_to_sel(&mut self) {
        self.clear_sel();
        let mut e = self.first_in_ael();
        while e != INVALID {
            let node = self.sel.link_before(DICT_HEAD, e);
            self.edge_mut(e).sel_node = node;
            e = self.next_in_ael(e);
        }
    }

    fn swap_positions_in_sel(&mut self, e1: EdgeIdx, e2: EdgeIdx) {
        let (n1, n2) = (self.edge(e1).sel_node, self.edge(e2).sel_node);
        if n1 == INVALID || n2 == INVALID || n1 == n2 {
            return;
        }
        self.sel.swap_keys(n1, n2);
        self.edge_mut(e1).sel_node = n2;
        self.edge_mut(e2).sel_node = n1;
    }

    /// Replace `e` in the AEL by the next edge of its bound.
    fn update_edge_into_ael(&mut self, e: EdgeIdx) -> Result<EdgeIdx, ClipError> {
        let next = self.edge(e).next_in_lml;
        if next == INVALID {
            return Err(ClipError::Internal(
                "bound advanced past its maximum".into(),
            ));
        }
        let node = self.edge(e).ael_node;
        let old = self.edge(e).clone();
        {
            let n = self.edge_mut(next);
            n.out_idx = old.out_idx;
            n.side = old.side;
            n.wind_delta = old.wind_delta;
            n.wind_cnt = old.wind_cnt;
            n.wind_cnt2 = old.wind_cnt2;
            n.ael_node = node;
            n.curr = n.bot;
        }
        if node != INVALID {
            self.ael.set_key(node, next);
        }
        self.edge_mut(e).ael_node = INVALID;
        if !self.edge(next).is_horizontal() {
            let top_y = self.edge(next).top.y;
            self.insert_scanbeam(top_y);
        }
        Ok(next)
    }

    // Winding

    fn fill_rules(&self, e: EdgeIdx) -> (FillRule, FillRule) {
        match self.edge(e).poly_type {
            PolyType::Subject => (self.subj_fill, self.clip_fill),
            PolyType::Clip => (self.clip_fill, self.subj_fill),
        }
    }

    fn set_winding_count(&mut self, edge: EdgeIdx) {
        let poly_type = self.edge(edge).poly_type;
        let (own_fill, other_fill) = self.fill_rules(edge);
        let wd = self.edge(edge).wind_delta;

        let mut e = self.prev_in_ael(edge);
        while e != INVALID && (self.edge(e).poly_type != poly_type || self.edge(e).wind_delta == 0)
        {
            e = self.prev_in_ael(e);
        }

        let (wind_cnt, mut wind_cnt2);
        if e == INVALID {
            wind_cnt = if wd == 0 {
                if own_fill == FillRule::Negative {
                    -1
                } else {
                    1
                }
            } else {
                wd
            };
            wind_cnt2 = 0;
            e = self.first_in_ael();
        } else if own_fill == FillRule::EvenOdd {
            wind_cnt = wd;
            wind_cnt2 = self.edge(e).wind_cnt2;
            e = self.next_in_ael(e);
        } else {
            let (ewc, ewd) = (self.edge(e).wind_cnt, self.edge(e).wind_delta);
            wind_cnt = if ewc * ewd < 0 {
                // The previous edge leaves a region of this type.
                if ewc.abs() > 1 {
                    if ewd * wd < 0 {
                        ewc
                    } else {
                        ewc + wd
                    }
                } else if wd == 0 {
                    1
                } else {
                    wd
                }
            } else if wd == 0 {
                if ewc < 0 {
                    ewc - 1
                } else {
                    ewc + 1
                }
            } else if ewd * wd < 0 {
                ewc
            } else {
                ewc + wd
            };
            wind_cnt2 = self.edge(e).wind_cnt2;
            e = self.next_in_ael(e);
        }

        // Count the other polygon set between `e` and `edge`.
        if other_fill == FillRule::EvenOdd {
            while e != INVALID && e != edge {
                if self.edge(e).wind_delta != 0 {
                    wind_cnt2 = if wind_cnt2 == 0 { 1 } else { 0 };
                }
                e = self.next_in_ael(e);
            }
        } else {
            while e != INVALID && e != edge {
                wind_cnt2 += self.edge(e).wind_delta;
                e = self.next_in_ael(e);
            }
        }
        let ed = self.edge_mut(edge);
        ed.wind_cnt = wind_cnt;
        ed.wind_cnt2 = wind_cnt2;
    }

    fn is_contributing(&self, edge: EdgeIdx) -> bool {
        let (own_fill, other_fill) = self.fill_rules(edge);
        let ed = self.edge(edge);
        let own_inside = match own_fill {
            FillRule::EvenOdd => ed.wind_delta != 0 || ed.wind_cnt == 1,
            FillRule::NonZero => ed.wind_cnt.abs() == 1,
            FillRule::Positive => ed.wind_cnt == 1,
            FillRule::Negative => ed.wind_cnt == -1,
        };
        if !own_inside {
            return false;
        }
        let other_filled = other_fill.is_filled(ed.wind_cnt2);
        match self.clip_type {
            ClipType::Intersection => other_filled,
            ClipType::Union => !other_filled,
            ClipType::Difference => {
                if ed.poly_type == PolyType::Subject {
                    !other_filled
                } else {
                    other_filled
                }
            }
            ClipType::Xor => true,
        }
    }

    fn insert_local_minima_into_ael(&mut self, bot_y: i64) -> Result<(), ClipError> {
        while let Some(lm) = self.pop_local_minima(bot_y) {
            let (lb, rb) = (lm.left_bound, lm.right_bound);
            self.insert_edge_into_ael(lb, INVALID);
            self.insert_edge_into_ael(rb, lb);
            self.set_winding_count(lb);
            let (wc, wc2) = (self.edge(lb).wind_cnt, self.edge(lb).wind_cnt2);
            self.edge_mut(rb).wind_cnt = wc;
            self.edge_mut(rb).wind_cnt2 = wc2;

            let mut op1 = INVALID;
            if self.is_contributing(lb) {
                let bot = self.edge(lb).bot;
                op1 = self.add_local_min_poly(lb, rb, bot);
            }
            let lb_top = self.edge(lb).top.y;
            self.insert_scanbeam(lb_top);

            if self.edge(rb).is_horizontal() {
                let next = self.edge(rb).next_in_lml;
                if next != INVALID {
                    let y = self.edge(next).top.y;
                    self.insert_scanbeam(y);
                }
                self.add_edge_to_sel(rb);
            } else {
                let y = self.edge(rb).top.y;
                self.insert_scanbeam(y);
            }

            // A horizontal right bound may overlap a horizontal that closed
            // on this scanline.
            if op1 != INVALID
                && self.edge(rb).is_horizontal()
                && !self.ghost_joins.is_empty()
                && self.edge(rb).wind_delta != 0
            {
                let (bx, tx) = (self.edge(rb).bot.x, self.edge(rb).top.x);
                for i in 0..self.ghost_joins.len() {
                    let gj = self.ghost_joins[i];
                    let x = self.out_pts[gj.out_pt1 as usize].pt.x;
                    if horz_segments_overlap(x, gj.off_pt.x, bx, tx) {
                        self.add_join(gj.out_pt1, op1, gj.off_pt);
                    }
                }
            }

            let lb_prev = self.prev_in_ael(lb);
            if op1 != INVALID && self.edge(lb).out_idx >= 0 && lb_prev != INVALID {
                let (p, l) = (self.edge(lb_prev), self.edge(lb));
                if p.curr.x == l.bot.x
                    && p.out_idx >= 0
                    && slopes_equal4(p.curr, p.top, l.curr, l.top)
                    && l.wind_delta != 0
                    && p.wind_delta != 0
                {
                    let (bot, top) = (l.bot, l.top);
                    let op2 = self.add_out_pt(lb_prev, bot);
                    self.add_join(op1, op2, top);
                }
            }

            if self.next_in_ael(lb) != rb {
                let rb_prev = self.prev_in_ael(rb);
                if op1 != INVALID && self.edge(rb).out_idx >= 0 && rb_prev != INVALID {
                    let (p, r) = (self.edge(rb_prev), self.edge(rb));
                    if p.out_idx >= 0
                        && slopes_equal4(p.curr, p.top, r.curr, r.top)
                        && r.wind_delta != 0
                        && p.wind_delta != 0
                    {
                        let (bot, top) = (r.bot, r.top);
                        let op2 = self.add_out_pt(rb_prev, bot);
                        self.add_join(op1, op2, top);
                    }
                }
                // Edges between the new bounds cross the right bound right here.
                let pt = self.edge(lb).curr;
                let mut e = self.next_in_ael(lb);
                while e != INVALID && e != rb {
                    self.intersect_edges(rb, e, pt);
                    e = self.next_in_ael(e);
                }
            }
        }
        Ok(())
    }

    fn swap_sides(&mut self, e1: EdgeIdx, e2: EdgeIdx) {
        let s1 = self.edge(e1).side;
        let s2 = self.edge(e2).side;
        self.edge_mut(e1).side = s2;
        self.edge_mut(e2).side = s1;
    }

    fn swap_poly_indexes(&mut self, e1: EdgeIdx, e2: EdgeIdx) {
        let o1 = self.edge(e1).out_idx;
        let o2 = self.edge(e2).out_idx;
        self.edge_mut(e1).out_idx = o2;
        self.edge_mut(e2).out_idx = o1;
    }

    /// Update winding counts where `e1` and `e2` cross at `pt` and emit
    /// whatever output the crossing implies. `e1` is left of `e2` below
    /// the crossing.
    fn intersect_edges(&mut self, e1: EdgeIdx, e2: EdgeIdx, pt: IntPoint) {
        let e1_contributing = self.edge(e1).out_idx >= 0;
        let e2_contributing = self.edge(e2).out_idx >= 0;
        let (e1_fill, e1_fill2) = self.fill_rules(e1);
        let (e2_fill, e2_fill2) = self.fill_rules(e2);

        // Update winding counts. Both edges are on the left of the other's
        // region afterwards.
        if self.edge(e1).poly_type == self.edge(e2).poly_type {
            if e1_fill == FillRule::EvenOdd {
                let (w1, w2) = (self.edge(e1).wind_cnt, self.edge(e2).wind_cnt);
                self.edge_mut(e1).wind_cnt = w2;
                self.edge_mut(e2).wind_cnt = w1;
            } else {
                let (d1, d2) = (self.edge(e1).wind_delta, self.edge(e2).wind_delta);
                let w1 = self.edge(e1).wind_cnt;
                self.edge_mut(e1).wind_cnt = if w1 + d2 == 0 { -w1 } else { w1 + d2 };
                let w2 = self.edge(e2).wind_cnt;
                self.edge_mut(e2).wind_cnt = if w2 - d1 == 0 { -w2 } else { w2 - d1 };
            }
        } else {
            let d2 = self.edge(e2).wind_delta;
            let c2 = self.edge(e1).wind_cnt2;
            self.edge_mut(e1).wind_cnt2 = if e2_fill == FillRule::EvenOdd {
                if c2 == 0 {
                    1
                } else {
                    0
                }
            } else {
                c2 + d2
            };
            let d1 = self.edge(e1).wind_delta;
            let c2 = self.edge(e2).wind_cnt2;
            self.edge_mut(e2).wind_cnt2 = if e1_fill == FillRule::EvenOdd {
                if c2 == 0 {
                    1
                } else {
                    0
                }
            } else {
                c2 - d1
            };
        }

        let norm = |fill: FillRule, w: i32| match fill {
            FillRule::Positive => w,
            FillRule::Negative => -w,
            _ => w.abs(),
        };
        let e1_wc = norm(e1_fill, self.edge(e1).wind_cnt);
        let e2_wc = norm(e2_fill, self.edge(e2).wind_cnt);

        if e1_contributing && e2_contributing {
            if (e1_wc != 0 && e1_wc != 1)
                || (e2_wc != 0 && e2_wc != 1)
                || (self.edge(e1).poly_type != self.edge(e2).poly_type
                    && self.clip_type != ClipType::Xor)
            {
                self.add_local_max_poly(e1, e2, pt);
            } else {
                self.add_out_pt(e1, pt);
                self.add_out_pt(e2, pt);
                self.swap_sides(e1, e2);
                self.swap_poly_indexes(e1, e2);
            }
        } else if e1_contributing {
            if e2_wc == 0 || e2_wc == 1 {
                self.add_out_pt(e1, pt);
                self.swap_sides(e1, e2);
                self.swap_poly_indexes(e1, e2);
            }
        } else if e2_contributing {
            if e1_wc == 0 || e1_wc == 1 {
                self.add_out_pt(e2, pt);
                self.swap_sides(e1, e2);
                self.swap_poly_indexes(e1, e2);
            }
        } else if (e1_wc == 0 || e1_wc == 1) && (e2_wc == 0 || e2_wc == 1) {
            // Neither edge is contributing: the crossing may open a new output.
            let e1_wc2 = norm(e1_fill2, self.edge(e1).wind_cnt2);
            let e2_wc2 = norm(e2_fill2, self.edge(e2).wind_cnt2);
            if self.edge(e1).poly_type != self.edge(e2).poly_type {
                self.add_local_min_poly(e1, e2, pt);
            } else if e1_wc == 1 && e2_wc == 1 {
                let open = match self.clip_type {
                    ClipType::Intersection => e1_wc2 > 0 && e2_wc2 > 0,
                    ClipType::Union => e1_wc2 <= 0 && e2_wc2 <= 0,
                    ClipType::Difference => {
                        (self.edge(e1).poly_type == PolyType::Clip && e1_wc2 > 0 && e2_wc2 > 0)
                            || (self.edge(e1).poly_type == PolyType::Subject
                                && e1_wc2 <= 0
                                && e2_wc2 <= 0)
                    }
                    ClipType::Xor => true,
                };
                if open {
                    self.add_local_min_poly(e1, e2, pt);
                }
            } else {
                self.swap_sides(e1, e2);
            }
        }
    }

    fn horz_direction(&self, e: EdgeIdx) -> (Direction, i64, i64) {
        let ed = self.edge(e);
        if ed.bot.x < ed.top.x {
            (Direction::LeftToRight, ed.bot.x, ed.top.x)
        } else {
            (Direction::RightToLeft, ed.top.x, ed.bot.x)
        }
    }

    fn process_horizontals(&mut self) -> Result<(), ClipError> {
        while let Some(horz) = self.pop_edge_from_sel() {
            self.process_horizontal(horz)?;
        }
        Ok(())
    }

    /// Walk a horizontal (and any consecutive horizontals of its bound)
    /// across the AEL, crossing every edge it passes.
    fn process_horizontal(&mut self, horz: EdgeIdx) -> Result<(), ClipError> {
        let mut horz = horz;
        let (mut dir, mut horz_left, mut horz_right) = self.horz_direction(horz);

        let mut e_last_horz = horz;
        while self.edge(e_last_horz).next_in_lml != INVALID
            && self.edge(self.edge(e_last_horz).next_in_lml).is_horizontal()
        {
            e_last_horz = self.edge(e_last_horz).next_in_lml;
        }
        let e_max_pair = if self.edge(e_last_horz).next_in_lml == INVALID {
            self.get_maxima_pair(e_last_horz)
        } else {
            INVALID
        };

        let mut op1 = INVALID;
        loop {
            let is_last_horz = horz == e_last_horz;
            let mut e = match dir {
                Direction::LeftToRight => self.next_in_ael(horz),
                Direction::RightToLeft => self.prev_in_ael(horz),
            };
            while e != INVALID {
                let ex = self.edge(e).curr.x;
                let (htx, hnext) = (self.edge(horz).top.x, self.edge(horz).next_in_lml);
                if (dir == Direction::LeftToRight && ex > horz_right)
                    || (dir == Direction::RightToLeft && ex < horz_left)
                {
                    break;
                }
                // Stop at the top of the horizontal when the next bound edge
                // heads off in the direction of `e`.
                if ex == htx && hnext != INVALID && self.edge(e).dx < self.edge(hnext).dx {
                    break;
                }

                if self.edge(horz).out_idx >= 0 {
                    let curr = self.edge(e).curr;
                    op1 = self.add_out_pt(horz, curr);
                    let mut e_next_horz = self.first_in_sel();
                    while e_next_horz != INVALID {
                        let n = self.edge(e_next_horz);
                        if n.out_idx >= 0
                            && horz_segments_overlap(
                                self.edge(horz).bot.x,
                                self.edge(horz).top.x,
                                n.bot.x,
                                n.top.x,
                            )
                        {
                            let top = n.top;
                            let op2 = self.get_last_out_pt(e_next_horz);
                            self.add_join(op2, op1, top);
                        }
                        e_next_horz = self.next_in_sel(e_next_horz);
                    }
                    let bot = self.edge(horz).bot;
                    self.add_ghost_join(op1, bot);
                }

                if e == e_max_pair && is_last_horz {
                    if self.edge(horz).out_idx >= 0 {
                        let top = self.edge(horz).top;
                        self.add_local_max_poly(horz, e_max_pair, top);
                    }
                    self.delete_from_ael(horz);
                    self.delete_from_ael(e_max_pair);
                    return Ok(());
                }

                let pt = IntPoint::new(ex, self.edge(horz).curr.y);
                if dir == Direction::LeftToRight {
                    self.intersect_edges(horz, e, pt);
                } else {
                    self.intersect_edges(e, horz, pt);
                }
                let e_next = match dir {
                    Direction::LeftToRight => self.next_in_ael(e),
                    Direction::RightToLeft => self.prev_in_ael(e),
                };
                self.swap_positions_in_ael(horz, e);
                e = e_next;
            }

            // Continue with the next horizontal of the same bound.
            let next = self.edge(horz).next_in_lml;
            if next == INVALID || !self.edge(next).is_horizontal() {
                break;
            }
            horz = self.update_edge_into_ael(horz)?;
            if self.edge(horz).out_idx >= 0 {
                let bot = self.edge(horz).bot;
                self.add_out_pt(horz, bot);
            }
            let (d, l, r) = self.horz_direction(horz);
            dir = d;
            horz_left = l;
            horz_right = r;
        }

        if self.edge(horz).out_idx >= 0 && op1 == INVALID {
            op1 = self.get_last_out_pt(horz);
            let mut e_next_horz = self.first_in_sel();
            while e_next_horz != INVALID {
                let n = self.edge(e_next_horz);
                if n.out_idx >= 0
                    && horz_segments_overlap(
                        self.edge(horz).bot.x,
                        self.edge(horz).top.x,
                        n.bot.x,
                        n.top.x,
                    )
                {
                    let top = n.top;
                    let op2 = self.get_last_out_pt(e_next_horz);
                    self.add_join(op2, op1, top);
                }
                e_next_horz = self.next_in_sel(e_next_horz);
            }
            let top = self.edge(horz).top;
            self.add_ghost_join(op1, top);
        }

        if self.edge(horz).next_in_lml != INVALID {
            if self.edge(horz).out_idx >= 0 {
                let top = self.edge(horz).top;
                op1 = self.add_out_pt(horz, top);
                horz = self.update_edge_into_ael(horz)?;
                if self.edge(horz).wind_delta == 0 {
                    return Ok(());
                }
                // Join the new edge to a collinear neighbour that shares its start.
                let e_prev = self.prev_in_ael(horz);
                let e_next = self.next_in_ael(horz);
                let h = self.edge(horz).clone();
                if e_prev != INVALID {
                    let p = self.edge(e_prev);
                    if p.curr == h.bot
                        && p.wind_delta != 0
                        && p.out_idx >= 0
                        && p.curr.y > p.top.y
                        && slopes_equal4(h.curr, h.top, p.curr, p.top)
                    {
                        let op2 = self.add_out_pt(e_prev, h.bot);
                        self.add_join(op1, op2, h.top);
                        return Ok(());
                    }
                }
                if e_next != INVALID {
                    let n = self.edge(e_next);
                    if n.curr == h.bot
                        && n.wind_delta != 0
                        && n.out_idx >= 0
                        && n.curr.y > n.top.y
                        && slopes_equal4(h.curr, h.top, n.curr, n.top)
                    {
                        let op2 = self.add_out_pt(e_next, h.bot);
                        self.add_join(op1, op2, h.top);
                    }
                }
            } else {
                self.update_edge_into_ael(horz)?;
            }
        } else {
            if self.edge(horz).out_idx >= 0 {
                let top = self.edge(horz).top;
                self.add_out_pt(horz, top);
            }
            self.delete_from_ael(horz);
        }
        Ok(())
    }

    fn process_intersections(&mut self, top_y: i64) -> Result<(), ClipError> {
        if self.ael.is_empty() {
            return Ok(());
        }
        self.build_intersect_list(top_y);
        if self.intersections.is_empty() {
            return Ok(());
        }
        if self.intersections.len() > 1 && !self.fixup_intersection_order() {
            self.intersections.clear();
            self.clear_sel();
            return Err(ClipError::Internal(format!(
                "intersections below y={} cannot be ordered between adjacent edges",
                top_y
            )));
        }
        self.process_intersect_list();
        self.clear_sel();
        Ok(())
    }

    /// Bubble-sort the SEL by X at `top_y`; every swap is a crossing.
    fn build_intersect_list(&mut self, top_y: i64) {
        self.clear_sel();
        let mut e = self.first_in_ael();
        while e != INVALID {
            let x = self.edge(e).top_x(top_y);
            self.edge_mut(e).curr.x = x;
            let node = self.sel.link_before(DICT_HEAD, e);
            self.edge_mut(e).sel_node = node;
            e = self.next_in_ael(e);
        }

        // Everything from `limit` onwards is already in place.
        let mut limit = INVALID;
        let mut is_modified = true;
        while is_modified && !self.sel.is_empty() {
            is_modified = false;
            let mut e = self.first_in_sel();
            loop {
                let e_next = self.next_in_sel(e);
                if e_next == INVALID || e_next == limit {
                    break;
                }
                if self.edge(e).curr.x > self.edge(e_next).curr.x {
                    let mut pt = self.intersect_point(e, e_next);
                    if pt.y < top_y {
                        pt = IntPoint::new(self.edge(e).top_x(top_y), top_y);
                    }
                    self.intersections.push(IntersectNode {
                        edge1: e,
                        edge2: e_next,
                        pt,
                    });
                    self.swap_positions_in_sel(e, e_next);
                    is_modified = true;
                } else {
                    e = e_next;
                }
            }
            if self.prev_in_sel(e) == INVALID {
                break;
            }
            limit = e;
        }
        self.clear_sel();
        trace!("{} intersections below y={}", self.intersections.len(), top_y);
    }

    /// Crossing point of two edges, clamped to the current scanbeam.
    fn intersect_point(&self, e1: EdgeIdx, e2: EdgeIdx) -> IntPoint {
        let (a, b) = (self.edge(e1), self.edge(e2));
        let mut ip = IntPoint::default();
        if a.dx == b.dx {
            ip.y = a.curr.y;
            ip.x = a.top_x(ip.y);
            return ip;
        }
        if a.delta.x == 0 {
            ip.x = a.bot.x;
            if b.is_horizontal() {
                ip.y = b.bot.y;
            } else {
                let b2 = b.bot.y as f64 - b.bot.x as f64 / b.dx;
                ip.y = round(ip.x as f64 / b.dx + b2);
            }
        } else if b.delta.x == 0 {
            ip.x = b.bot.x;
            if a.is_horizontal() {
                ip.y = a.bot.y;
            } else {
                let b1 = a.bot.y as f64 - a.bot.x as f64 / a.dx;
                ip.y = round(ip.x as f64 / a.dx + b1);
            }
        } else {
            let b1 = a.bot.x as f64 - a.bot.y as f64 * a.dx;
            let b2 = b.bot.x as f64 - b.bot.y as f64 * b.dx;
            let q = (b2 - b1) / (a.dx - b.dx);
            ip.y = round(q);
            ip.x = if a.dx.abs() < b.dx.abs() {
                round(a.dx * q + b1)
            } else {
                round(b.dx * q + b2)
            };
        }

        if ip.y < a.top.y || ip.y < b.top.y {
            if a.top.y > b.top.y {
                ip.y = a.top.y;
            } else {
                ip.y = b.top.y;
            }
            ip.x = if a.dx.abs() < b.dx.abs() {
                a.top_x(ip.y)
            } else {
                b.top_x(ip.y)
            };
        }
        // Never below the current scanline.
        if ip.y > a.curr.y {
            ip.y = a.curr.y;
            ip.x = if a.dx.abs() > b.dx.abs() {
                b.top_x(ip.y)
            } else {
                a.top_x(ip.y)
            };
        }
        ip
    }

    fn edges_adjacent(&self, node: &IntersectNode) -> bool {
        self.next_in_sel(node.edge1) == node.edge2 || self.prev_in_sel(node.edge1) == node.edge2
    }

    /// Reorder crossings so each one is between edges adjacent at that moment.
    fn fixup_intersection_order(&mut self) -> bool {
        self.intersections.sort_by(|a, b| b.pt.y.cmp(&a.pt.y));
        self.copy_ael_to_sel();
        let cnt = self.intersections.len();
        for i in 0..cnt {
            if !self.edges_adjacent(&self.intersections[i]) {
                let mut j = i + 1;
                while j < cnt && !self.edges_adjacent(&self.intersections[j]) {
                    j += 1;
                }
                if j == cnt {
                    return false;
                }
                self.intersections.swap(i, j);
            }
            let node = self.intersections[i];
            self.swap_positions_in_sel(node.edge1, node.edge2);
        }
        true
    }

    fn process_intersect_list(&mut self) {
        let list = std::mem::take(&mut self.intersections);
        for node in &list {
            self.intersect_edges(node.edge1, node.edge2, node.pt);
            self.swap_positions_in_ael(node.edge1, node.edge2);
        }
        self.intersections = list;
        self.intersections.clear();
    }

    fn is_maxima(&self, e: EdgeIdx, y: i64) -> bool {
        e != INVALID && self.edge(e).top.y == y && self.edge(e).next_in_lml == INVALID
    }

    fn is_intermediate(&self, e: EdgeIdx, y: i64) -> bool {
        self.edge(e).top.y == y && self.edge(e).next_in_lml != INVALID
    }

    /// The other bound that ends at the same maximum as `e`.
    fn get_maxima_pair(&self, e: EdgeIdx) -> EdgeIdx {
        let ed = self.edge(e);
        let (n, p) = (ed.next, ed.prev);
        if self.edge(n).top == ed.top && self.edge(n).next_in_lml == INVALID {
            n
        } else if self.edge(p).top == ed.top && self.edge(p).next_in_lml == INVALID {
            p
        } else {
            INVALID
        }
    }

    /// As `get_maxima_pair`, but only a pair that is still active.
    fn get_maxima_pair_ex(&self, e: EdgeIdx) -> EdgeIdx {
        let r = self.get_maxima_pair(e);
        if r == INVALID || (self.edge(r).ael_node == INVALID && !self.edge(r).is_horizontal()) {
            INVALID
        } else {
            r
        }
    }

    fn do_maxima(&mut self, e: EdgeIdx) -> Result<(), ClipError> {
        let e_max_pair = self.get_maxima_pair_ex(e);
        if e_max_pair == INVALID {
            if self.edge(e).out_idx >= 0 {
                let top = self.edge(e).top;
                self.add_out_pt(e, top);
            }
            self.delete_from_ael(e);
            return Ok(());
        }

        let mut e_next = self.next_in_ael(e);
        while e_next != INVALID && e_next != e_max_pair {
            let top = self.edge(e).top;
            self.intersect_edges(e, e_next, top);
            self.swap_positions_in_ael(e, e_next);
            e_next = self.next_in_ael(e);
        }

        let (o1, o2) = (self.edge(e).out_idx, self.edge(e_max_pair).out_idx);
        if o1 == UNASSIGNED && o2 == UNASSIGNED {
            self.delete_from_ael(e);
            self.delete_from_ael(e_max_pair);
        } else if o1 >= 0 && o2 >= 0 {
            let top = self.edge(e).top;
            self.add_local_max_poly(e, e_max_pair, top);
            self.delete_from_ael(e);
            self.delete_from_ael(e_max_pair);
        } else {
            let top = self.edge(e).top;
            return Err(ClipError::Internal(format!(
                "maximum at ({}, {}) closes only one side of an output ring",
                top.x, top.y
            )));
        }
        Ok(())
    }

    fn process_edges_at_top_of_scanbeam(&mut self, top_y: i64) -> Result<(), ClipError> {
        let mut e = self.first_in_ael();
        while e != INVALID {
            // Maxima are closed here unless their pair is a horizontal,
            // which closes them when it is processed.
            let mut is_maxima_edge = self.is_maxima(e, top_y);
            if is_maxima_edge {
                let pair = self.get_maxima_pair_ex(e);
                is_maxima_edge = pair == INVALID || !self.edge(pair).is_horizontal();
            }

            if is_maxima_edge {
                let e_prev = self.prev_in_ael(e);
                self.do_maxima(e)?;
                e = if e_prev == INVALID {
                    self.first_in_ael()
                } else {
                    self.next_in_ael(e_prev)
                };
            } else {
                let next_lml = self.edge(e).next_in_lml;
                if self.is_intermediate(e, top_y) && self.edge(next_lml).is_horizontal() {
                    e = self.update_edge_into_ael(e)?;
                    if self.edge(e).out_idx >= 0 {
                        let bot = self.edge(e).bot;
                        self.add_out_pt(e, bot);
                    }
                    self.add_edge_to_sel(e);
                } else {
                    let x = self.edge(e).top_x(top_y);
                    self.edge_mut(e).curr = IntPoint::new(x, top_y);
                }
                e = self.next_in_ael(e);
            }
        }

        self.process_horizontals()?;

        // Advance bounds whose current edge ends on this scanline.
        let mut e = self.first_in_ael();
        while e != INVALID {
            if self.is_intermediate(e, top_y) {
                let op = if self.edge(e).out_idx >= 0 {
                    let top = self.edge(e).top;
                    self.add_out_pt(e, top)
                } else {
                    INVALID
                };
                e = self.update_edge_into_ael(e)?;

                let e_prev = self.prev_in_ael(e);
                let e_next = self.next_in_ael(e);
                let ed = self.edge(e).clone();
                let joins_with = |n: EdgeIdx| -> bool {
                    if n == INVALID || op == INVALID {
                        return false;
                    }
                    let o = &self.edges[n as usize];
                    o.curr == ed.bot
                        && o.out_idx >= 0
                        && o.curr.y > o.top.y
                        && slopes_equal4(ed.curr, ed.top, o.curr, o.top)
                        && ed.wind_delta != 0
                        && o.wind_delta != 0
                };
                if joins_with(e_prev) {
                    let op2 = self.add_out_pt(e_prev, ed.bot);
                    self.add_join(op, op2, ed.top);
                } else if joins_with(e_next) {
                    let op2 = self.add_out_pt(e_next, ed.bot);
                    self.add_join(op, op2, ed.top);
                }
            }
            e = self.next_in_ael(e);
        }
        Ok(())
    }
}

/// Run one operation over two path sets with fresh clipper state.
pub fn boolean_op(
    clip_type: ClipType,
    subject: &[Vec<IntPoint>],
    clip: &[Vec<IntPoint>],
    fill: FillRule,
) -> Result<Paths, ClipError> {
    let mut c = Clipper::new();
    c.add_paths(subject, PolyType::Subject, true)?;
    c.add_paths(clip, PolyType::Clip, true)?;
    c.execute(clip_type, fill, fill)
}

pub fn union(subject: &[Vec<IntPoint>], fill: FillRule) -> Result<Paths, ClipError> {
    boolean_op(ClipType::Union, subject, &[], fill)
}

pub fn intersection(
    subject: &[Vec<IntPoint>],
    clip: &[Vec<IntPoint>],
    fill: FillRule,
) -> Result<Paths, ClipError> {
    boolean_op(ClipType::Intersection, subject, clip, fill)
}

pub fn difference(
    subject: &[Vec<IntPoint>],
    clip: &[Vec<IntPoint>],
    fill: FillRule,
) -> Result<Paths, ClipError> {
    boolean_op(ClipType::Difference, subject, clip, fill)
}

pub fn xor(
    subject: &[Vec<IntPoint>],
    clip: &[Vec<IntPoint>],
    fill: FillRule,
) -> Result<Paths, ClipError> {
    boolean_op(ClipType::Xor, subject, clip, fill)
}
