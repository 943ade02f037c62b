//! Cache Module
//!
//! Bounded in-memory cache of block payloads.
//!
//! ## Responsibilities
//! - O(1) lookup and insert by block id
//! - Evict exactly the least-recently-used entry when full
//! - Safe to share between threads (internally serialized)
//!
//! The cache holds blocks in their at-rest form (ciphertext when
//! encryption is on). It knows nothing about encryption or documents,
//! and losing its contents never loses data: every entry can be
//! re-read from the data file.

mod lru_cache;

pub use lru_cache::BlockCache;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}
