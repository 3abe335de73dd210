// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// A two-phase priority queue:
//   Phase 1 (pre-init): inserts go into a sorted key array.
//   Phase 2 (post-init): inserts go directly into a min-heap.
// Deletion is supported via handles.
//
// The ordering is supplied as a `leq` function, so the same queue serves as
// the clipper's scanbeam list (largest Y first) and as the refinement queue
// of bad triangles (worst quality first).

pub type Handle = i32;

pub const INVALID_HANDLE: Handle = 0x0fff_ffff;

#[derive(Clone, Debug)]
struct HandleElem<K> {
    key: Option<K>,
    /// Heap position while live, next free handle while on the free list.
    node: usize,
}

/// A heap-based priority queue (used after initialization).
#[derive(Clone, Debug)]
struct Heap<K> {
    /// nodes[1..=size] are active; nodes[0] unused. Stores handle indices.
    nodes: Vec<usize>,
    handles: Vec<HandleElem<K>>,
    size: usize,
    free_list: usize,
    initialized: bool,
    leq: fn(&K, &K) -> bool,
}

impl<K: Copy> Heap<K> {
    fn new(leq: fn(&K, &K) -> bool) -> Self {
        Heap {
            nodes: vec![0, 1],
            handles: vec![
                HandleElem { key: None, node: 0 },
                HandleElem { key: None, node: 1 },
            ],
            size: 0,
            free_list: 0,
            initialized: false,
            leq,
        }
    }

    fn clear(&mut self) {
        self.nodes.truncate(2);
        self.handles.truncate(2);
        self.handles[1] = HandleElem { key: None, node: 1 };
        self.size = 0;
        self.free_list = 0;
        self.initialized = false;
    }

    /// Empty keys compare as larger than everything.
    #[inline]
    fn le(&self, h1: usize, h2: usize) -> bool {
        match (&self.handles[h1].key, &self.handles[h2].key) {
            (Some(a), Some(b)) => (self.leq)(a, b),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => true,
        }
    }

    fn float_down(&mut self, mut curr: usize) {
        let h_curr = self.nodes[curr];
        loop {
            let mut child = curr << 1;
            if child < self.size && self.le(self.nodes[child + 1], self.nodes[child]) {
                child += 1;
            }
            if child > self.size || self.le(h_curr, self.nodes[child]) {
                self.nodes[curr] = h_curr;
                self.handles[h_curr].node = curr;
                break;
            }
            let h_child = self.nodes[child];
            self.nodes[curr] = h_child;
            self.handles[h_child].node = curr;
            curr = child;
        }
    }

    fn float_up(&mut self, mut curr: usize) {
        let h_curr = self.nodes[curr];
        loop {
            let parent = curr >> 1;
            let h_parent = self.nodes[parent];
            if parent == 0 || self.le(h_parent, h_curr) {
                self.nodes[curr] = h_curr;
                self.handles[h_curr].node = curr;
                break;
            }
            self.nodes[curr] = h_parent;
            self.handles[h_parent].node = curr;
            curr = parent;
        }
    }

    fn init(&mut self) {
        for i in (1..=self.size).rev() {
            self.float_down(i);
        }
        self.initialized = true;
    }

    fn insert(&mut self, key: K) -> Handle {
        self.size += 1;
        let curr = self.size;
        if curr >= self.nodes.len() {
            self.nodes.resize(curr + 1, 0);
        }

        let free_handle = if self.free_list == 0 {
            self.handles.push(HandleElem { key: None, node: 0 });
            self.handles.len() - 1
        } else {
            let f = self.free_list;
            self.free_list = self.handles[f].node;
            f
        };

        self.nodes[curr] = free_handle;
        self.handles[free_handle] = HandleElem {
            key: Some(key),
            node: curr,
        };

        if self.initialized {
            self.float_up(curr);
        }
        free_handle as Handle
    }

    fn release(&mut self, h: usize) {
        self.handles[h].key = None;
        self.handles[h].node = self.free_list;
        self.free_list = h;
    }

    fn extract_min(&mut self) -> Option<K> {
        if self.size == 0 {
            return None;
        }
        let h_min = self.nodes[1];
        let min_key = self.handles[h_min].key;

        self.nodes[1] = self.nodes[self.size];
        self.handles[self.nodes[1]].node = 1;
        self.release(h_min);

        self.size -= 1;
        if self.size > 0 {
            self.float_down(1);
        }
        min_key
    }

    fn delete(&mut self, h_curr: usize) {
        if h_curr >= self.handles.len() || self.handles[h_curr].key.is_none() {
            return;
        }
        let curr = self.handles[h_curr].node;

        self.nodes[curr] = self.nodes[self.size];
        self.handles[self.nodes[curr]].node = curr;

        self.size -= 1;
        if curr <= self.size {
            if curr <= 1 || self.le(self.nodes[curr >> 1], self.nodes[curr]) {
                self.float_down(curr);
            } else {
                self.float_up(curr);
            }
        }
        self.release(h_curr);
    }

    #[inline]
    fn minimum(&self) -> Option<K> {
        if self.size == 0 {
            None
        } else {
            self.handles[self.nodes[1]].key
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// The combined priority queue (sort-array + heap).
#[derive(Clone, Debug)]
pub struct PriorityQ<K> {
    heap: Heap<K>,
    /// Pre-init key storage; deleted entries become None.
    keys: Vec<Option<K>>,
    /// Indices into keys, sorted so the minimum sits at the end.
    order: Vec<usize>,
    size: usize,
    initialized: bool,
    leq: fn(&K, &K) -> bool,
}

impl<K: Copy> PriorityQ<K> {
    pub fn new(leq: fn(&K, &K) -> bool) -> Self {
        PriorityQ {
            heap: Heap::new(leq),
            keys: Vec::new(),
            order: Vec::new(),
            size: 0,
            initialized: false,
            leq,
        }
    }

    /// Back to the pre-init phase, keeping allocations.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.keys.clear();
        self.order.clear();
        self.size = 0;
        self.initialized = false;
    }

    /// Sort the pre-init keys and switch inserts over to the heap.
    pub fn init(&mut self) {
        self.order.clear();
        self.order.extend(0..self.keys.len());

        let keys = &self.keys;
        let leq = self.leq;
        // Descending, so the minimum is popped from the end.
        self.order.sort_by(|&a, &b| match (&keys[a], &keys[b]) {
            (Some(ka), Some(kb)) => {
                let ab = leq(ka, kb);
                let ba = leq(kb, ka);
                if ab && ba {
                    std::cmp::Ordering::Equal
                } else if ab {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Less
                }
            }
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
        });

        self.size = self.order.len();
        self.trim_deleted();
        self.initialized = true;
        self.heap.init();
    }

    /// Insert a key. Returns a handle.
    /// Negative handles are for the sort-array; non-negative for the heap.
    pub fn insert(&mut self, key: K) -> Handle {
        if self.initialized {
            return self.heap.insert(key);
        }
        let curr = self.keys.len();
        self.keys.push(Some(key));
        -(curr as Handle + 1)
    }

    fn sort_min(&self) -> Option<K> {
        if self.size == 0 {
            None
        } else {
            self.keys[self.order[self.size - 1]]
        }
    }

    fn trim_deleted(&mut self) {
        while self.size > 0 && self.keys[self.order[self.size - 1]].is_none() {
            self.size -= 1;
        }
    }

    fn heap_first(&self, sort_min: &K) -> bool {
        match self.heap.minimum() {
            Some(heap_min) => (self.leq)(&heap_min, sort_min),
            None => false,
        }
    }

    /// Extract the minimum key.
    pub fn extract_min(&mut self) -> Option<K> {
        let sort_min = match self.sort_min() {
            Some(k) => k,
            None => return self.heap.extract_min(),
        };
        if self.heap_first(&sort_min) {
            return self.heap.extract_min();
        }
        self.size -= 1;
        self.trim_deleted();
        Some(sort_min)
    }

    /// Peek at the minimum key without extracting.
    pub fn minimum(&self) -> Option<K> {
        let sort_min = match self.sort_min() {
            Some(k) => k,
            None => return self.heap.minimum(),
        };
        if self.heap_first(&sort_min) {
            return self.heap.minimum();
        }
        Some(sort_min)
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0 && self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        let pending = if self.initialized {
            self.order[..self.size]
                .iter()
                .filter(|&&i| self.keys[i].is_some())
                .count()
        } else {
            self.keys.iter().filter(|k| k.is_some()).count()
        };
        pending + self.heap.size
    }

    /// Delete the key with the given handle.
    pub fn delete(&mut self, handle: Handle) {
        if handle >= 0 {
            self.heap.delete(handle as usize);
            return;
        }
        let curr = (-(handle + 1)) as usize;
        if let Some(slot) = self.keys.get_mut(curr) {
            *slot = None;
        }
        if self.initialized {
            self.trim_deleted();
        }
    }
}
