// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Vec-backed arena with a free list. Triangles live here: refinement deletes
// and recreates them constantly, and a tile's worth of slots is kept around
// between calls by `clear()` instead of being handed back to the allocator.

/// A simple arena allocator backed by a Vec.
/// Items are allocated by pushing to the vec and freed via a freelist.
#[derive(Clone, Debug)]
pub struct BucketAlloc<T> {
    items: Vec<Option<T>>,
    free_list: Vec<u32>,
}

impl<T> BucketAlloc<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Store `value`, reusing a freed slot when one exists.
    pub fn insert(&mut self, value: T) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            self.items[idx as usize] = Some(value);
            idx
        } else {
            let idx = self.items.len() as u32;
            self.items.push(Some(value));
            idx
        }
    }

    /// Free an item by index (returns it to the free list).
    pub fn free(&mut self, idx: u32) {
        if let Some(slot) = self.items.get_mut(idx as usize) {
            if slot.take().is_some() {
                self.free_list.push(idx);
            }
        }
    }

    #[inline]
    pub fn get(&self, idx: u32) -> Option<&T> {
        self.items.get(idx as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, idx: u32) -> Option<&mut T> {
        self.items.get_mut(idx as usize)?.as_mut()
    }

    #[inline]
    pub fn contains(&self, idx: u32) -> bool {
        self.get(idx).is_some()
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the highest slot index ever handed out.
    pub fn capacity_index(&self) -> u32 {
        self.items.len() as u32
    }

    /// Drop every item but keep the backing storage.
    pub fn clear(&mut self) {
        self.items.clear();
        self.free_list.clear();
    }

    /// Live items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_ref().map(|t| (i as u32, t)))
    }

    pub fn indices(&self) -> Vec<u32> {
        self.iter().map(|(i, _)| i).collect()
    }
}

impl<T: Default> BucketAlloc<T> {
    /// Allocate a default item, returning its index.
    pub fn alloc(&mut self) -> u32 {
        self.insert(T::default())
    }
}

/// Panics on a freed or never-allocated slot, like slice indexing.
impl<T> std::ops::Index<u32> for BucketAlloc<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: u32) -> &T {
        match self.items[idx as usize] {
            Some(ref t) => t,
            None => panic!("slot {} is not allocated", idx),
        }
    }
}

impl<T> std::ops::IndexMut<u32> for BucketAlloc<T> {
    #[inline]
    fn index_mut(&mut self, idx: u32) -> &mut T {
        match self.items[idx as usize] {
            Some(ref mut t) => t,
            None => panic!("slot {} is not allocated", idx),
        }
    }
}

impl<T> Default for BucketAlloc<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free() {
        let mut ba: BucketAlloc<u32> = BucketAlloc::new();
        let a = ba.alloc();
        let b = ba.alloc();
        assert_ne!(a, b);
        ba.free(a);
        let c = ba.insert(7);
        // c should reuse a's slot
        assert_eq!(c, a);
        assert_eq!(ba.get(c), Some(&7));
        assert_eq!(ba.len(), 2);
    }

    #[test]
    fn double_free_is_ignored() {
        let mut ba: BucketAlloc<i32> = BucketAlloc::new();
        let idx = ba.insert(3);
        ba.free(idx);
        ba.free(idx);
        assert!(ba.get(idx).is_none());
        assert_eq!(ba.insert(1), idx);
        assert_ne!(ba.insert(2), idx);
    }

    #[test]
    fn clear_keeps_nothing_alive() {
        let mut ba: BucketAlloc<i32> = BucketAlloc::new();
        for i in 0..10 {
            ba.insert(i);
        }
        ba.free(4);
        assert_eq!(ba.iter().count(), 9);
        ba[3] += 10;
        assert_eq!(ba[3], 13);
        ba.clear();
        assert!(ba.is_empty());
        assert_eq!(ba.insert(5), 0);
    }
}
