// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Half-edge topology used while building the initial Delaunay triangulation.
//
// Design:
//   - INVALID: u32::MAX  (null index)
//   - Half-edges are allocated in pairs: edges[i] and edges[i^1] are always a
//     pair. sym(e) = e ^ 1. Even index = e, odd index = eSym.
//   - Only the topology is stored. Each half-edge knows its origin vertex
//     (an index into the caller's point slice), the next edge CCW around its
//     origin (onext) and the next edge CCW around its left face (lnext).
//     The invariant lnext(sym(onext(e))) == e holds for every live edge.
//   - Deleted pairs go on a free list and are reused by make_edge.

mod delaunay;

pub use delaunay::FaceRecord;

pub const INVALID: u32 = u32::MAX;

/// Index into Mesh::edges
pub type EdgeIdx = u32;
/// Index into the caller's point slice
pub type VertIdx = u32;

/// Compute the symmetric half-edge index (always the other half of the pair).
#[inline(always)]
pub fn sym(e: EdgeIdx) -> EdgeIdx {
    e ^ 1
}

#[derive(Clone, Debug)]
pub struct HalfEdge {
    /// Next edge CCW around the origin vertex.
    pub onext: EdgeIdx,
    /// Next edge CCW around the left face.
    pub lnext: EdgeIdx,
    /// Origin vertex index.
    pub org: VertIdx,
    /// Used by face extraction.
    pub mark: bool,
}

impl Default for HalfEdge {
    fn default() -> Self {
        Self {
            onext: INVALID,
            lnext: INVALID,
            org: INVALID,
            mark: false,
        }
    }
}

/// The half-edge mesh.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub edges: Vec<HalfEdge>,
    free: Vec<EdgeIdx>,
}

impl Mesh {
    pub fn new() -> Self {
        Mesh {
            edges: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Forget every edge, keeping the storage.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.free.clear();
    }

    // ──────────────────────────── Navigation ─────────────────────────────

    #[inline]
    pub fn org(&self, e: EdgeIdx) -> VertIdx {
        self.edges[e as usize].org
    }

    #[inline]
    pub fn dst(&self, e: EdgeIdx) -> VertIdx {
        self.edges[(e ^ 1) as usize].org
    }

    #[inline]
    pub fn onext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].onext
    }

    #[inline]
    pub fn lnext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].lnext
    }

    /// Oprev: Sym->Lnext
    #[inline]
    pub fn oprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[(e ^ 1) as usize].lnext
    }

    /// Lprev: Onext->Sym
    #[inline]
    pub fn lprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].onext ^ 1
    }

    /// Rprev: Sym->Onext
    #[inline]
    pub fn rprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[(e ^ 1) as usize].onext
    }

    #[inline]
    pub fn is_live(&self, e: EdgeIdx) -> bool {
        self.edges
            .get(e as usize)
            .map(|h| h.org != INVALID)
            .unwrap_or(false)
    }

    /// Number of live undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2 - self.free.len()
    }

    // ──────────────────────────── Operators ──────────────────────────────

    /// Create an isolated edge from `org` to `dst`.
    pub fn make_edge(&mut self, org: VertIdx, dst: VertIdx) -> EdgeIdx {
        let e = match self.free.pop() {
            Some(e) => e,
            None => {
                let e = self.edges.len() as EdgeIdx;
                self.edges.push(HalfEdge::default());
                self.edges.push(HalfEdge::default());
                e
            }
        };
        let s = e ^ 1;
        self.edges[e as usize] = HalfEdge {
            onext: e,
            lnext: s,
            org,
            mark: false,
        };
        self.edges[s as usize] = HalfEdge {
            onext: s,
            lnext: e,
            org: dst,
            mark: false,
        };
        e
    }

    /// Exchange the origin rings of `a` and `b` (and their left-face rings).
    /// Applied to two edges of one ring it splits it, to two rings it joins them.
    pub fn splice(&mut self, a: EdgeIdx, b: EdgeIdx) {
        if a == b {
            return;
        }
        let a_onext = self.edges[a as usize].onext;
        let b_onext = self.edges[b as usize].onext;
        self.edges[(a_onext ^ 1) as usize].lnext = b;
        self.edges[(b_onext ^ 1) as usize].lnext = a;
        self.edges[a as usize].onext = b_onext;
        self.edges[b as usize].onext = a_onext;
    }

    /// Add an edge from the destination of `a` to the origin of `b`, so that
    /// `a`, the new edge and `b` share a left face.
    pub fn connect(&mut self, a: EdgeIdx, b: EdgeIdx) -> EdgeIdx {
        let e = self.make_edge(self.dst(a), self.org(b));
        let a_lnext = self.lnext(a);
        self.splice(e, a_lnext);
        self.splice(e ^ 1, b);
        e
    }

    /// Detach the pair from both of its vertices and recycle it.
    pub fn delete_edge(&mut self, e: EdgeIdx) {
        let e = e & !1;
        let o = self.oprev(e);
        self.splice(e, o);
        let os = self.oprev(e ^ 1);
        self.splice(e ^ 1, os);
        self.edges[e as usize] = HalfEdge::default();
        self.edges[(e ^ 1) as usize] = HalfEdge::default();
        self.free.push(e);
    }

    /// Verify the ring invariants of every live edge.
    pub fn check(&self) -> Result<(), String> {
        for (i, h) in self.edges.iter().enumerate() {
            if h.org == INVALID {
                continue;
            }
            let e = i as EdgeIdx;
            if !self.is_live(h.onext) || !self.is_live(h.lnext) {
                return Err(format!("edge {} links to a dead edge", e));
            }
            if self.lnext(sym(self.onext(e))) != e {
                return Err(format!("edge {} breaks lnext(sym(onext(e))) == e", e));
            }
            if self.org(self.onext(e)) != h.org {
                return Err(format!("onext of edge {} leaves its origin", e));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_edge_creates_single_edge() {
        let mut mesh = Mesh::new();
        let e = mesh.make_edge(0, 1);
        assert_eq!(mesh.org(e), 0);
        assert_eq!(mesh.dst(e), 1);
        assert_eq!(mesh.onext(e), e);
        assert_eq!(mesh.lnext(e), sym(e));
        assert_eq!(mesh.edge_count(), 1);
        assert!(mesh.check().is_ok());
    }

    #[test]
    fn sym_involution() {
        for e in [0u32, 1, 2, 3, 100, 101] {
            assert_eq!(sym(sym(e)), e);
        }
    }

    #[test]
    fn connect_closes_a_triangle() {
        let mut mesh = Mesh::new();
        let a = mesh.make_edge(0, 1);
        let b = mesh.make_edge(1, 2);
        mesh.splice(sym(a), b);
        let c = mesh.connect(b, a);
        assert_eq!(mesh.org(c), 2);
        assert_eq!(mesh.dst(c), 0);
        // One face a -> b -> c and its mirror.
        assert_eq!(mesh.lnext(a), b);
        assert_eq!(mesh.lnext(b), c);
        assert_eq!(mesh.lnext(c), a);
        assert!(mesh.check().is_ok());
    }

    #[test]
    fn deleted_pairs_are_reused() {
        let mut mesh = Mesh::new();
        let a = mesh.make_edge(0, 1);
        let b = mesh.make_edge(1, 2);
        mesh.splice(sym(a), b);
        let c = mesh.connect(b, a);
        mesh.delete_edge(sym(c));
        assert!(!mesh.is_live(c));
        assert_eq!(mesh.edge_count(), 2);
        assert!(mesh.check().is_ok());
        assert_eq!(mesh.make_edge(5, 6), c);
    }
}
