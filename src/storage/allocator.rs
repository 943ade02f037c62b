//! Block id allocation
//!
//! A single atomic counter. Ids are handed out once and never reused.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::BlockId;

/// Issues strictly increasing block ids
#[derive(Debug)]
pub struct BlockAllocator {
    next_id: AtomicU64,
}

impl BlockAllocator {
    /// Start issuing ids at `next_id`
    pub fn new(next_id: BlockId) -> Self {
        Self {
            next_id: AtomicU64::new(next_id),
        }
    }

    /// Resume after the last slot implied by a data file of `file_len` bytes
    ///
    /// An empty file starts at 0; otherwise the last slot is
    /// `(file_len - 1) / block_size` and allocation continues after it.
    pub fn from_file_len(file_len: u64, block_size: usize) -> Self {
        let next_id = if file_len == 0 {
            0
        } else {
            (file_len - 1) / block_size as u64 + 1
        };
        Self::new(next_id)
    }

    /// Hand out the next id
    pub fn next_id(&self) -> BlockId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to [`BlockAllocator::next_id`] will return
    pub fn peek(&self) -> BlockId {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Whether `id` has ever been handed out
    pub fn is_allocated(&self, id: BlockId) -> bool {
        id < self.peek()
    }
}
