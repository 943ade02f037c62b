//! Storage Manager
//!
//! Owns the data file, the WAL, the cache, the allocator and the
//! encryption envelope, and coordinates every read and write.
//!
//! ## Write path (in this order, all before returning)
//! 1. Allocate (or target) a block id
//! 2. Seal the payload if encryption is on
//! 3. Append `varint(id) ‖ sealed` to the WAL and make it durable
//! 4. Put the sealed bytes in the cache
//! 5. Write the framed record into slot `id` of the data file
//!
//! ## Read path
//! Cache first; on a miss, read slot `id`, verify it and populate the
//! cache with the sealed bytes. Either way the caller gets plaintext.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};

use crate::cache::{BlockCache, CacheStats};
use crate::config::Config;
use crate::crypto::{resolve_envelope, Envelope, ENCRYPTION_OVERHEAD};
use crate::error::{Result, VaultError};
use crate::wal::{varint_len, BlockRecord, RecoveryResult, WalRecovery, WalWriter};
use crate::BlockId;

use super::slot::{read_at, write_at, SlotLayout};
use super::BlockAllocator;

/// File handles, dropped on close
struct OpenFiles {
    data: File,
    wal: Mutex<WalWriter>,
}

/// The block store
///
/// ## Concurrency:
/// - `write_lock`: serializes every mutation (write/replace/modify/close)
/// - `files`: readers hold it shared for their whole read; a writer holds
///   it upgradable while logging and exclusive while touching the cache
///   and the data file, so a read never sees a slot mid-write
/// - `cache` and `allocator` synchronize internally
pub struct StorageManager {
    config: Config,
    layout: SlotLayout,
    files: RwLock<Option<OpenFiles>>,
    cache: BlockCache,
    allocator: BlockAllocator,
    envelope: Option<Envelope>,
    write_lock: Mutex<()>,
    last_recovery: RecoveryResult,
}

impl StorageManager {
    /// Open or create the store described by `config`
    ///
    /// On startup:
    /// 1. Validate config and resolve the encryption key
    /// 2. Open/create the data file
    /// 3. Replay every WAL record into its slot (without re-logging it)
    /// 4. Sync the data file, then open the WAL for appending
    /// 5. Resume the allocator from the data file size
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let envelope = resolve_envelope(&config.encryption)?;
        let layout = SlotLayout::new(config.block_size);

        create_parent_dir(&config.data_path)?;
        create_parent_dir(&config.wal_path)?;

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&config.data_path)?;

        let (records, recovery) = WalRecovery::recover(&config.wal_path, layout.max_body_len())?;
        for record in &records {
            let slot = layout.encode(record)?;
            Self::persist_slot(&data, &layout, record.block_id, &slot)?;
        }
        if !records.is_empty() {
            data.sync_all()?;
        }

        let wal = WalWriter::open(
            &config.wal_path,
            config.wal_sync_strategy,
            layout.max_body_len(),
        )?;

        let allocator = BlockAllocator::from_file_len(data.metadata()?.len(), config.block_size);
        let cache = BlockCache::new(config.cache_capacity)?;

        tracing::info!(
            data = %config.data_path.display(),
            wal = %config.wal_path.display(),
            wal_bytes = wal.len(),
            replayed = recovery.records_recovered,
            truncated = recovery.was_truncated,
            next_block_id = allocator.peek(),
            encrypted = envelope.is_some(),
            "Storage manager opened"
        );

        Ok(Self {
            layout,
            files: RwLock::new(Some(OpenFiles {
                data,
                wal: Mutex::new(wal),
            })),
            cache,
            allocator,
            envelope,
            write_lock: Mutex::new(()),
            last_recovery: recovery,
            config,
        })
    }

    /// Store `payload` in a newly allocated block
    pub fn write_block(&self, payload: &[u8]) -> Result<BlockId> {
        let _write_guard = self.write_lock.lock();
        let files = self.files.upgradable_read();
        if files.is_none() {
            return Err(VaultError::Closed);
        }

        // Validate against the id we are about to take so a rejected
        // payload never burns an id
        let record = BlockRecord::new(self.allocator.peek(), self.seal(payload)?);
        let slot = self.layout.encode(&record)?;

        let id = self.allocator.next_id();
        debug_assert_eq!(id, record.block_id);

        self.commit(files, record, slot)?;
        tracing::debug!(block_id = id, len = payload.len(), "Wrote block");
        Ok(id)
    }

    /// Read the plaintext payload of block `id`
    ///
    /// Ids never written fail with [`VaultError::BlockNotFound`].
    pub fn read_block(&self, id: BlockId) -> Result<Vec<u8>> {
        let files = self.files.read();
        let open = files.as_ref().ok_or(VaultError::Closed)?;
        let sealed = self.load(open, id)?;
        self.unseal(&sealed)
    }

    /// Overwrite existing block `id` with `payload`
    pub fn replace_block(&self, id: BlockId, payload: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let files = self.files.upgradable_read();
        if files.is_none() {
            return Err(VaultError::Closed);
        }
        if !self.allocator.is_allocated(id) {
            return Err(VaultError::BlockNotFound(id));
        }

        let record = BlockRecord::new(id, self.seal(payload)?);
        let slot = self.layout.encode(&record)?;
        self.commit(files, record, slot)?;

        tracing::debug!(block_id = id, len = payload.len(), "Replaced block");
        Ok(())
    }

    /// Read block `id`, transform its plaintext with `f` and write the result back
    ///
    /// Runs entirely under the write lock, so no other mutation can
    /// interleave. If `f` fails the block is left untouched.
    pub fn modify_block<F>(&self, id: BlockId, f: F) -> Result<()>
    where
        F: FnOnce(Vec<u8>) -> Result<Vec<u8>>,
    {
        let _write_guard = self.write_lock.lock();
        let files = self.files.upgradable_read();

        let current = {
            let open = files.as_ref().ok_or(VaultError::Closed)?;
            let sealed = self.load(open, id)?;
            self.unseal(&sealed)?
        };
        let updated = f(current)?;

        let record = BlockRecord::new(id, self.seal(&updated)?);
        let slot = self.layout.encode(&record)?;
        self.commit(files, record, slot)?;

        tracing::debug!(block_id = id, len = updated.len(), "Updated block");
        Ok(())
    }

    /// Flush the data file and the WAL to disk
    pub fn sync(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let files = self.files.read();
        let open = files.as_ref().ok_or(VaultError::Closed)?;
        open.data.sync_all()?;
        open.wal.lock().sync()?;
        Ok(())
    }

    /// Flush and close the data file, then the WAL
    ///
    /// Calling it again is a no-op; every other operation afterwards
    /// fails with [`VaultError::Closed`].
    pub fn close(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let mut files = self.files.write();

        if let Some(open) = files.take() {
            open.data.sync_all()?;
            drop(open.data);
            open.wal.into_inner().close()?;
            tracing::info!(data = %self.config.data_path.display(), "Storage manager closed");
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn block_size(&self) -> usize {
        self.layout.block_size()
    }

    /// The id the next write will receive
    pub fn next_block_id(&self) -> BlockId {
        self.allocator.peek()
    }

    /// Largest payload the next write can store
    pub fn max_payload_len(&self) -> usize {
        let overhead = if self.envelope.is_some() { ENCRYPTION_OVERHEAD } else { 0 };
        self.layout
            .max_body_len()
            .saturating_sub(varint_len(self.allocator.peek()) + overhead)
    }

    pub fn is_encrypted(&self) -> bool {
        self.envelope.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.files.read().is_none()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether block `id` is currently cached
    pub fn is_cached(&self, id: BlockId) -> bool {
        self.cache.contains(id)
    }

    /// What the startup replay did
    pub fn last_recovery(&self) -> &RecoveryResult {
        &self.last_recovery
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Log, cache and persist an encoded record (called with the write lock held)
    fn commit(
        &self,
        files: RwLockUpgradableReadGuard<'_, Option<OpenFiles>>,
        record: BlockRecord,
        slot: Vec<u8>,
    ) -> Result<()> {
        {
            let open = files.as_ref().ok_or(VaultError::Closed)?;
            open.wal.lock().append(&record)?;
        }

        // Readers are shut out from here until the slot is fully written
        let files = RwLockUpgradableReadGuard::upgrade(files);
        let open = files.as_ref().ok_or(VaultError::Closed)?;

        self.cache.put(record.block_id, record.payload);
        Self::persist_slot(&open.data, &self.layout, record.block_id, &slot)
    }

    /// Sealed bytes of block `id`, from the cache or the data file
    fn load(&self, open: &OpenFiles, id: BlockId) -> Result<Vec<u8>> {
        if !self.allocator.is_allocated(id) {
            return Err(VaultError::BlockNotFound(id));
        }
        if let Some(sealed) = self.cache.get(id) {
            return Ok(sealed);
        }

        let offset = self.layout.offset(id).ok_or(VaultError::BlockNotFound(id))?;
        let mut buf = vec![0u8; self.layout.block_size()];
        let read = read_at(&open.data, &mut buf, offset)?;
        let record = self.layout.decode(id, &buf[..read])?;

        tracing::debug!(block_id = id, "Cache miss, loaded block from data file");
        self.cache.put(id, record.payload.clone());
        Ok(record.payload)
    }

    /// Write an encoded slot at its offset; shared by live writes and replay
    fn persist_slot(data: &File, layout: &SlotLayout, id: BlockId, slot: &[u8]) -> Result<()> {
        let offset = layout.offset(id).ok_or(VaultError::BlockNotFound(id))?;
        write_at(data, slot, offset)
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match &self.envelope {
            Some(envelope) => envelope.seal(plaintext),
            None => Ok(plaintext.to_vec()),
        }
    }

    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        match &self.envelope {
            Some(envelope) => envelope.open(sealed),
            None => Ok(sealed.to_vec()),
        }
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("data_path", &self.config.data_path)
            .field("wal_path", &self.config.wal_path)
            .field("block_size", &self.layout.block_size())
            .field("next_block_id", &self.allocator.peek())
            .field("encrypted", &self.envelope.is_some())
            .finish()
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
