// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Records shared by the clipping sweep: the edge record that travels through
// the active edge list and the local minima that seed new bounds.
// All logic is driven through the Clipper in clip.rs.

use crate::dict::NodeIdx;
use crate::geom::{IntPoint, HORIZONTAL};

pub const INVALID: u32 = u32::MAX;

/// Index into Clipper::edges
pub type EdgeIdx = u32;

/// `out_idx` of an edge that is not (yet) contributing to an output polygon.
pub const UNASSIGNED: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PolyType {
    Subject,
    Clip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    RightToLeft,
    LeftToRight,
}

/// A directed contour edge. `bot` is the end with the larger Y, where the
/// sweep first meets it; `curr` tracks its X on the current scanbeam.
#[derive(Clone, Debug)]
pub struct ClipEdge {
    pub bot: IntPoint,
    pub curr: IntPoint,
    pub top: IntPoint,
    pub delta: IntPoint,
    /// dx/dy, or HORIZONTAL.
    pub dx: f64,
    pub poly_type: PolyType,
    pub side: EdgeSide,
    /// +1 or -1 depending on contour direction.
    pub wind_delta: i32,
    /// Winding count of its own polygon set.
    pub wind_cnt: i32,
    /// Winding count of the opposite polygon set.
    pub wind_cnt2: i32,
    pub out_idx: i32,
    /// Ring links around the originating contour.
    pub next: EdgeIdx,
    pub prev: EdgeIdx,
    /// Next edge of the same bound, INVALID at the top of the bound.
    pub next_in_lml: EdgeIdx,
    /// Node in the AEL while active.
    pub ael_node: NodeIdx,
    /// Node in the SEL while sorted.
    pub sel_node: NodeIdx,
}

impl Default for ClipEdge {
    fn default() -> Self {
        ClipEdge {
            bot: IntPoint::default(),
            curr: IntPoint::default(),
            top: IntPoint::default(),
            delta: IntPoint::default(),
            dx: 0.0,
            poly_type: PolyType::Subject,
            side: EdgeSide::Left,
            wind_delta: 0,
            wind_cnt: 0,
            wind_cnt2: 0,
            out_idx: UNASSIGNED,
            next: INVALID,
            prev: INVALID,
            next_in_lml: INVALID,
            ael_node: INVALID,
            sel_node: INVALID,
        }
    }
}

impl ClipEdge {
    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.delta.y == 0
    }

    /// Orient bot/top from the current vertex and its successor and cache the slope.
    pub fn init_bounds(&mut self, next_curr: IntPoint, poly_type: PolyType) {
        if self.curr.y >= next_curr.y {
            self.bot = self.curr;
            self.top = next_curr;
        } else {
            self.top = self.curr;
            self.bot = next_curr;
        }
        self.set_dx();
        self.poly_type = poly_type;
    }

    pub fn set_dx(&mut self) {
        self.delta = IntPoint::new(self.top.x - self.bot.x, self.top.y - self.bot.y);
        self.dx = if self.delta.y == 0 {
            HORIZONTAL
        } else {
            self.delta.x as f64 / self.delta.y as f64
        };
    }

    /// X of the edge at scanline `y`.
    #[inline]
    pub fn top_x(&self, y: i64) -> i64 {
        if y == self.top.y {
            return self.top.x;
        }
        self.bot.x + crate::geom::round(self.dx * (y - self.bot.y) as f64)
    }

    pub fn reverse_horizontal(&mut self) {
        // Swap horizontal edges' top and bottom X so they follow the bound.
        std::mem::swap(&mut self.top.x, &mut self.bot.x);
    }
}

/// Two edge chains rising from a shared lowest vertex.
#[derive(Clone, Copy, Debug)]
pub struct LocalMinimum {
    pub y: i64,
    pub left_bound: EdgeIdx,
    pub right_bound: EdgeIdx,
}
