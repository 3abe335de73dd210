// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Engine pooling. A tile task checks out one set of engines, uses it
// single-threaded, and the guard hands it back on drop so the arenas inside
// are cleared and reused rather than freed.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::clip::Clipper;
use crate::offset::Offsetter;
use crate::triangulation::Triangulator;

/// The engines one tile needs.
#[derive(Default)]
pub struct Engines {
    pub clipper: Clipper,
    pub offsetter: Offsetter,
    pub triangulator: Triangulator,
}

impl Engines {
    fn reset(&mut self) {
        self.clipper.clear();
        self.offsetter.clear();
    }
}

#[derive(Default)]
pub struct EnginePool {
    idle: Mutex<Vec<Engines>>,
}

impl EnginePool {
    pub fn new() -> Self {
        EnginePool::default()
    }

    /// Take an idle engine set, or build a fresh one.
    pub fn checkout(&self) -> PooledEngines<'_> {
        let engines = match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            // A panicking tile cannot leave a set half-used in the list.
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        PooledEngines {
            pool: self,
            engines: Some(engines.unwrap_or_default()),
        }
    }

    /// Engine sets currently waiting in the pool.
    pub fn idle_count(&self) -> usize {
        match self.idle.lock() {
            Ok(idle) => idle.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn give_back(&self, mut engines: Engines) {
        engines.reset();
        match self.idle.lock() {
            Ok(mut idle) => idle.push(engines),
            Err(poisoned) => poisoned.into_inner().push(engines),
        }
    }
}

/// Checked-out engines; returned to the pool when dropped.
pub struct PooledEngines<'a> {
    pool: &'a EnginePool,
    engines: Option<Engines>,
}

impl Deref for PooledEngines<'_> {
    type Target = Engines;

    fn deref(&self) -> &Engines {
        match self.engines {
            Some(ref e) => e,
            None => unreachable!("engines are only taken on drop"),
        }
    }
}

impl DerefMut for PooledEngines<'_> {
    fn deref_mut(&mut self) -> &mut Engines {
        match self.engines {
            Some(ref mut e) => e,
            None => unreachable!("engines are only taken on drop"),
        }
    }
}

impl Drop for PooledEngines<'_> {
    fn drop(&mut self) {
        if let Some(engines) = self.engines.take() {
            self.pool.give_back(engines);
        }
    }
}

/// Shared flag polled between region computations.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engines_return_on_drop() {
        let pool = EnginePool::new();
        assert_eq!(pool.idle_count(), 0);
        {
            let _a = pool.checkout();
            let _b = pool.checkout();
        }
        assert_eq!(pool.idle_count(), 2);
        let _c = pool.checkout();
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
