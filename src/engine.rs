//! Engine Module
//!
//! The handle external collaborators hold: raw block operations plus the
//! JSON document layer on top of them.
//!
//! ## Responsibilities
//! - Open the store (running WAL recovery) before accepting traffic
//! - Byte-level write/read/replace
//! - Document write/read and shallow merge-on-update
//! - Orderly shutdown

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::document::{self, Document};
use crate::error::Result;
use crate::storage::StorageManager;
use crate::BlockId;

/// The storage engine
///
/// `Engine` is `Send + Sync`; share it between threads behind an `Arc`.
/// All operations are synchronous and may block on disk I/O or locks.
#[derive(Debug)]
pub struct Engine {
    storage: StorageManager,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// Returns only after the WAL has been replayed into the data file.
    pub fn open(config: Config) -> Result<Self> {
        let storage = StorageManager::open(config)?;
        Ok(Self { storage })
    }

    /// Open with explicit data and WAL paths, defaults otherwise
    pub fn create_or_open(data_path: impl AsRef<Path>, wal_path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::with_paths(data_path.as_ref(), wal_path.as_ref()))
    }

    /// Open with both files inside `dir` (convenience method)
    pub fn open_path(dir: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(dir).build())
    }

    // =========================================================================
    // Block Operations
    // =========================================================================

    /// Store a payload in a new block and return its id
    pub fn write(&self, payload: &[u8]) -> Result<BlockId> {
        self.storage.write_block(payload)
    }

    /// Read a block's payload
    pub fn read(&self, id: BlockId) -> Result<Vec<u8>> {
        self.storage.read_block(id)
    }

    /// Overwrite an existing block's payload
    pub fn replace(&self, id: BlockId, payload: &[u8]) -> Result<()> {
        self.storage.replace_block(id, payload)
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Store a document in a new block
    pub fn write_document(&self, doc: &Document) -> Result<BlockId> {
        let bytes = document::serialize(doc)?;
        self.storage.write_block(&bytes)
    }

    /// Read the document stored in a block
    pub fn read_document(&self, id: BlockId) -> Result<Document> {
        let bytes = self.storage.read_block(id)?;
        document::deserialize(&bytes)
    }

    /// Shallow-merge `fragment` into the document stored in block `id`
    ///
    /// If the stored bytes are not a JSON object the block is left as is
    /// and a serialization error is returned.
    pub fn update(&self, id: BlockId, fragment: &Document) -> Result<()> {
        self.storage
            .modify_block(id, |existing| document::merge_bytes(&existing, fragment))
    }

    /// Store any serializable value as JSON in a new block
    pub fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<BlockId> {
        let bytes = document::to_bytes(value)?;
        self.storage.write_block(&bytes)
    }

    /// Read a block as JSON into any deserializable type
    pub fn read_json<T: DeserializeOwned>(&self, id: BlockId) -> Result<T> {
        let bytes = self.storage.read_block(id)?;
        document::from_bytes(&bytes)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush everything to disk without closing
    pub fn sync(&self) -> Result<()> {
        self.storage.sync()
    }

    /// Close the engine gracefully
    ///
    /// Safe to call more than once; other operations fail afterwards.
    pub fn close(&self) -> Result<()> {
        self.storage.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        self.storage.config()
    }

    pub fn next_block_id(&self) -> BlockId {
        self.storage.next_block_id()
    }

    pub fn is_encrypted(&self) -> bool {
        self.storage.is_encrypted()
    }
}
