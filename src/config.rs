//! Configuration for vaultblock
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::crypto::EncryptionKey;
use crate::error::{Result, VaultError};

/// Smallest block size that still leaves room for a framed record
pub const MIN_BLOCK_SIZE: usize = 64;

/// Main configuration for a vaultblock instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Data file holding one fixed-size slot per block
    pub data_path: PathBuf,

    /// Size of every slot in the data file (in bytes)
    pub block_size: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Write-ahead log file
    pub wal_path: PathBuf,

    /// How far each append is pushed before it is acknowledged
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of blocks held in the LRU cache
    pub cache_capacity: usize,

    // -------------------------------------------------------------------------
    // Encryption Configuration
    // -------------------------------------------------------------------------
    /// Where the at-rest encryption key comes from (if anywhere)
    pub encryption: EncryptionMode,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every append (survives power loss)
    EveryWrite,

    /// Flush to the OS after every append without fsync (survives process crashes only)
    FlushOnly,
}

/// Source of the at-rest encryption key
#[derive(Clone, PartialEq, Eq)]
pub enum EncryptionMode {
    /// Blocks are stored as plaintext
    Disabled,

    /// Caller-provided key
    Key(EncryptionKey),

    /// Key read from this file, generated and persisted on first use
    KeyFile(PathBuf),
}

impl std::fmt::Debug for EncryptionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncryptionMode::Disabled => f.write_str("Disabled"),
            EncryptionMode::Key(_) => f.write_str("Key(<redacted>)"),
            EncryptionMode::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
        }
    }
}

impl EncryptionMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EncryptionMode::Disabled)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./vaultblock_data/blocks.dat"),
            block_size: 4096,
            wal_path: PathBuf::from("./vaultblock_data/blocks.wal"),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            cache_capacity: 100,
            encryption: EncryptionMode::Disabled,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Default config pointed at the given data and WAL files
    pub fn with_paths(data_path: impl Into<PathBuf>, wal_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            wal_path: wal_path.into(),
            ..Self::default()
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(VaultError::Config(format!(
                "block_size must be at least {} bytes, got {}",
                MIN_BLOCK_SIZE, self.block_size
            )));
        }
        if self.block_size > u32::MAX as usize {
            return Err(VaultError::Config(format!(
                "block_size must fit in 32 bits, got {}",
                self.block_size
            )));
        }
        if self.cache_capacity == 0 {
            return Err(VaultError::Config(
                "cache_capacity must be greater than zero".to_string(),
            ));
        }
        if self.data_path == self.wal_path {
            return Err(VaultError::Config(format!(
                "data file and WAL must be different files: {}",
                self.data_path.display()
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data file path
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_path = path.into();
        self
    }

    /// Set the WAL file path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = path.into();
        self
    }

    /// Put both files under one directory (`blocks.dat` and `blocks.wal`)
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.config.data_path = dir.join("blocks.dat");
        self.config.wal_path = dir.join("blocks.wal");
        self
    }

    /// Set the slot size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the cache capacity (in blocks)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Encrypt blocks with a caller-provided key
    pub fn encryption_key(mut self, key: EncryptionKey) -> Self {
        self.config.encryption = EncryptionMode::Key(key);
        self
    }

    /// Encrypt blocks with a key persisted at `path`
    pub fn encryption_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.encryption = EncryptionMode::KeyFile(path.into());
        self
    }

    /// Set the encryption mode directly
    pub fn encryption(mut self, mode: EncryptionMode) -> Self {
        self.config.encryption = mode;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
