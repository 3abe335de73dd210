// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// An index-linked, ordered doubly-linked list. The clipper keeps its active
// edge list (AEL) and sorted edge list (SEL) in two of these: keys are edge
// indices and the order is maintained by the sweep itself, so besides sorted
// insertion the list supports positional linking and key swaps.
//
// INVALID = u32::MAX represents a null key (sentinel nodes).

use crate::sweep::INVALID;

/// Index into Dict::nodes
pub type NodeIdx = u32;

#[derive(Clone, Debug)]
pub struct DictNode {
    pub key: u32, // edge index, or INVALID for sentinel / free nodes
    pub next: NodeIdx,
    pub prev: NodeIdx,
}

impl Default for DictNode {
    fn default() -> Self {
        DictNode {
            key: INVALID,
            next: INVALID,
            prev: INVALID,
        }
    }
}

/// The "head" sentinel node is always at index 0.
/// It forms a circular list: head.prev == head.next == head when empty.
#[derive(Clone, Debug)]
pub struct Dict {
    pub nodes: Vec<DictNode>,
    free: Vec<NodeIdx>,
}

/// Index of the head sentinel node.
pub const DICT_HEAD: NodeIdx = 0;

impl Dict {
    pub fn new() -> Self {
        let head = DictNode {
            key: INVALID,
            next: DICT_HEAD,
            prev: DICT_HEAD,
        };
        Dict {
            nodes: vec![head],
            free: Vec::new(),
        }
    }

    /// Unlink everything, keeping the node storage.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].next = DICT_HEAD;
        self.nodes[0].prev = DICT_HEAD;
        self.free.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes[DICT_HEAD as usize].next == DICT_HEAD
    }

    fn new_node(&mut self, key: u32, prev: NodeIdx, next: NodeIdx) -> NodeIdx {
        let node = DictNode { key, next, prev };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx as usize] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as NodeIdx
            }
        }
    }

    /// Link `key` directly before `node` (DICT_HEAD appends at the back).
    pub fn link_before(&mut self, node: NodeIdx, key: u32) -> NodeIdx {
        let prev = self.nodes[node as usize].prev;
        let idx = self.new_node(key, prev, node);
        self.nodes[prev as usize].next = idx;
        self.nodes[node as usize].prev = idx;
        idx
    }

    /// Link `key` directly after `node` (DICT_HEAD pushes at the front).
    pub fn link_after(&mut self, node: NodeIdx, key: u32) -> NodeIdx {
        let next = self.nodes[node as usize].next;
        self.link_before(next, key)
    }

    /// Insert `key` at the first position after `start` whose key it sorts
    /// before, walking forward. `before(existing, key)` decides the order.
    pub fn insert_from<F>(&mut self, start: NodeIdx, key: u32, before: F) -> NodeIdx
    where
        F: Fn(u32, u32) -> bool,
    {
        let mut node = self.nodes[start as usize].next;
        loop {
            let node_key = self.nodes[node as usize].key;
            if node == DICT_HEAD || before(node_key, key) {
                break;
            }
            node = self.nodes[node as usize].next;
        }
        self.link_before(node, key)
    }

    /// dictDelete: remove a node from the dictionary.
    pub fn delete(&mut self, node: NodeIdx) {
        if node == DICT_HEAD || self.nodes[node as usize].next == INVALID {
            return;
        }
        let next = self.nodes[node as usize].next;
        let prev = self.nodes[node as usize].prev;
        self.nodes[next as usize].prev = prev;
        self.nodes[prev as usize].next = next;
        self.nodes[node as usize] = DictNode::default();
        self.free.push(node);
    }

    /// Exchange the keys held by two nodes.
    pub fn swap_keys(&mut self, a: NodeIdx, b: NodeIdx) {
        let ka = self.nodes[a as usize].key;
        self.nodes[a as usize].key = self.nodes[b as usize].key;
        self.nodes[b as usize].key = ka;
    }

    #[inline]
    pub fn set_key(&mut self, node: NodeIdx, key: u32) {
        self.nodes[node as usize].key = key;
    }

    /// dictKey: get the key of a node.
    #[inline]
    pub fn key(&self, node: NodeIdx) -> u32 {
        self.nodes[node as usize].key
    }

    /// dictMin: first real node (after sentinel).
    #[inline]
    pub fn min(&self) -> NodeIdx {
        self.nodes[DICT_HEAD as usize].next
    }

    /// dictMax: last real node (before sentinel, via prev).
    #[inline]
    pub fn max(&self) -> NodeIdx {
        self.nodes[DICT_HEAD as usize].prev
    }

    /// dictSucc: successor of a node.
    #[inline]
    pub fn succ(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].next
    }

    /// dictPred: predecessor of a node.
    #[inline]
    pub fn pred(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].prev
    }

    /// Keys from front to back.
    pub fn keys(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut n = self.min();
        while n != DICT_HEAD {
            out.push(self.key(n));
            n = self.succ(n);
        }
        out
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}
