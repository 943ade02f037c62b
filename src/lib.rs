//! # vaultblock
//!
//! An embedded, file-backed block storage engine with:
//! - Fixed-size blocks addressed by monotonically increasing ids
//! - Write-Ahead Logging (WAL) replayed on every open
//! - A bounded LRU cache of at-rest block bytes
//! - Optional AES-256-GCM encryption at rest
//! - A JSON document layer with shallow merge-on-update
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                              │
//! │              (blocks + JSON documents)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Storage Manager                            │
//! │       (one write lock, RwLock around the files)             │
//! └───┬──────────────┬──────────────┬──────────────┬────────────┘
//!     │              │              │              │
//!     ▼              ▼              ▼              ▼
//! ┌────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐
//! │Envelope│   │   WAL    │   │  Cache   │   │ Data File │
//! │(AES-GCM│   │ (Append) │   │  (LRU)   │   │  (Slots)  │
//! └────────┘   └──────────┘   └──────────┘   └───────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod cache;
pub mod crypto;
pub mod document;
pub mod engine;
pub mod storage;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, EncryptionMode, WalSyncStrategy};
pub use document::Document;
pub use engine::Engine;
pub use error::{Result, VaultError};
pub use storage::StorageManager;

/// Identifier of a block; also its slot index in the data file
pub type BlockId = u64;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of vaultblock
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
