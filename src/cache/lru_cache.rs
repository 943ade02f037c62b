//! LRU cache implementation
//!
//! `lru::LruCache` behind a Mutex: even `get` reorders recency, so
//! every access takes the lock.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{Result, VaultError};
use crate::BlockId;

use super::CacheStats;

/// Capacity-bounded LRU map from block id to at-rest bytes
pub struct BlockCache {
    entries: Mutex<LruCache<BlockId, Vec<u8>>>,
    capacity: NonZeroUsize,

    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BlockCache {
    /// Create an empty cache holding at most `capacity` blocks
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            VaultError::Config("cache capacity must be greater than zero".to_string())
        })?;

        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Look up a block and mark it most-recently-used
    pub fn get(&self, id: BlockId) -> Option<Vec<u8>> {
        let found = self.entries.lock().get(&id).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Insert or replace a block and mark it most-recently-used
    ///
    /// Evicts the least-recently-used block if the cache was full.
    pub fn put(&self, id: BlockId, payload: Vec<u8>) {
        let evicted = self.entries.lock().push(id, payload);
        // `push` also hands back the old value when `id` was already present
        if matches!(evicted, Some((old_id, _)) if old_id != id) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Check for a block without touching recency
    pub fn contains(&self, id: BlockId) -> bool {
        self.entries.lock().contains(&id)
    }

    /// Drop every block
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
