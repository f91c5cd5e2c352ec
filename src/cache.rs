//! Bounded memoization of batch evaluation results.
//!
//! The cache maps a key (in practice a predicate together with a dataset
//! identity) to a shared [`BitSet`]. Entries are evicted in least-recently-used
//! order once `capacity` is reached; an evicted entry is simply recomputed on the
//! next lookup.
//!
//! Each entry owns a slot with its own lock. The global lock only guards the LRU
//! bookkeeping and is never held while computing, so concurrent lookups of
//! *different* keys proceed in parallel, while concurrent lookups of the *same*
//! key wait for a single computation. Slots still being computed are also kept
//! in a pending table, so evicting them from the LRU never starts a second
//! computation of the same key.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use lru::LruCache;

use crate::bitset::BitSet;

type Slot = Arc<Mutex<Option<Arc<BitSet>>>>;

struct Slots<K> {
    lru: LruCache<K, Slot>,
    /// Slots created but not yet filled, whether or not the LRU still holds them.
    pending: HashMap<K, Slot>,
}

pub struct BitCache<K> {
    slots: Mutex<Slots<K>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K: Hash + Eq + Clone> BitCache<K> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(Slots {
                lru: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of entries in the cache, computed or in flight.
    pub fn len(&self) -> usize {
        self.lock_slots().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_slots().lru.is_empty()
    }

    /// Drops all entries. Computations already in flight finish normally.
    pub fn clear(&self) {
        self.lock_slots().lru.clear();
    }

    /// Returns the cached result for `key`, or runs `compute` and caches its result.
    ///
    /// At most one `compute` runs per key at a time; other callers asking for the
    /// same key block until it finishes. Errors are returned to the caller and
    /// nothing is cached, so the next lookup retries.
    pub fn get_or_compute<E>(&self, key: K, compute: impl FnOnce() -> Result<BitSet, E>) -> Result<Arc<BitSet>, E> {
        let slot = {
            let mut slots = self.lock_slots();
            if let Some(slot) = slots.lru.get(&key) {
                Arc::clone(slot)
            } else if let Some(slot) = slots.pending.get(&key).cloned() {
                trace!("pending slot re-inserted after eviction");
                slots.lru.put(key.clone(), Arc::clone(&slot));
                slot
            } else {
                let slot = Slot::default();
                slots.pending.insert(key.clone(), Arc::clone(&slot));
                slots.lru.put(key.clone(), Arc::clone(&slot));
                slot
            }
        };

        // A panic inside `compute` poisons the slot but leaves it empty,
        // so the next caller recomputes.
        let mut value = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bits) = value.as_ref() {
            trace!("cache hit");
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(bits));
        }

        debug!("cache miss");
        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = compute();
        // Still holding the slot lock, so waiters see either the value or an
        // empty slot they recompute themselves.
        self.lock_slots().pending.remove(&key);
        let bits = Arc::new(result?);
        *value = Some(Arc::clone(&bits));
        Ok(bits)
    }

    fn lock_slots(&self) -> MutexGuard<'_, Slots<K>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
