//! Storage Module
//!
//! Fixed-size block storage in a single flat data file.
//!
//! ## Responsibilities
//! - Hand out block ids (never reused)
//! - Map block ids to slots at `id * block_size`
//! - Coordinate WAL, cache, encryption and data file on every write
//! - Replay the WAL into the data file at startup
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐  offset 0
//! │ Slot 0                                 │
//! │ ┌─────────┬─────────┬────────┬───────┐ │
//! │ │ Len (4) │ CRC (4) │varint  │payload│ │  + zero padding
//! │ └─────────┴─────────┴────────┴───────┘ │
//! ├────────────────────────────────────────┤  offset block_size
//! │ Slot 1                                 │
//! │ ...                                    │
//! └────────────────────────────────────────┘
//! ```

mod allocator;
mod manager;
mod slot;

pub use allocator::BlockAllocator;
pub use manager::StorageManager;
pub use slot::SlotLayout;
