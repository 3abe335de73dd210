// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::trace;

#[derive(Debug, Default)]
struct Placements {
    /// placement id -> tile that claimed it
    owner: HashMap<u64, u64>,
    by_tile: HashMap<u64, Vec<u64>>,
}

/// Model placements already handed out, shared by every tile build.
///
/// A placement belongs to the first tile that claims it, so objects that
/// straddle tile borders are emitted once. Clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct PlacementRegistry {
    inner: Arc<Mutex<Placements>>,
}

impl PlacementRegistry {
    pub fn new() -> Self {
        PlacementRegistry::default()
    }

    fn lock(&self) -> MutexGuard<'_, Placements> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Claim `ids` for `tile`. Returns the ids this tile now owns: those
    /// nobody held before plus those it already held.
    pub fn claim(&self, tile: u64, ids: &[u64]) -> Vec<u64> {
        let mut reg = self.lock();
        let mut won = Vec::new();
        for &id in ids {
            match reg.owner.get(&id) {
                Some(&owner) if owner == tile => {
                    if !won.contains(&id) {
                        won.push(id);
                    }
                }
                Some(_) => {}
                None => {
                    reg.owner.insert(id, tile);
                    reg.by_tile.entry(tile).or_default().push(id);
                    won.push(id);
                }
            }
        }
        trace!("tile {} claimed {} of {} placements", tile, won.len(), ids.len());
        won
    }

    /// Forget every placement held by `tile`. Returns how many were freed.
    pub fn release_tile(&self, tile: u64) -> usize {
        let mut reg = self.lock();
        let ids = reg.by_tile.remove(&tile).unwrap_or_default();
        for id in &ids {
            reg.owner.remove(id);
        }
        ids.len()
    }

    pub fn owner_of(&self, id: u64) -> Option<u64> {
        self.lock().owner.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_wins() {
        let reg = PlacementRegistry::new();
        assert_eq!(reg.claim(1, &[10, 11]), vec![10, 11]);
        assert_eq!(reg.claim(2, &[11, 12]), vec![12]);
        assert_eq!(reg.owner_of(11), Some(1));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn reclaiming_keeps_ownership() {
        let reg = PlacementRegistry::new();
        reg.claim(1, &[5]);
        assert_eq!(reg.claim(1, &[5, 5]), vec![5]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn release_frees_ids_for_other_tiles() {
        let reg = PlacementRegistry::new();
        let shared = reg.clone();
        reg.claim(1, &[1, 2, 3]);
        assert_eq!(shared.release_tile(1), 3);
        assert!(reg.is_empty());
        assert_eq!(shared.claim(2, &[2]), vec![2]);
        assert_eq!(reg.release_tile(7), 0);
    }
}
