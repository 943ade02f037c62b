//! Encryption Module
//!
//! AES-256-GCM authenticated encryption for block payloads.
//!
//! ## Responsibilities
//! - Seal payloads before they reach the WAL, cache or data file
//! - Fail closed on any authentication failure
//! - Load or create the key the engine holds for its lifetime
//!
//! ## Sealed Format
//! ```text
//! ┌─────────────┬────────────────────┬────────────┐
//! │ Nonce (12)  │    Ciphertext      │  Tag (16)  │
//! └─────────────┴────────────────────┴────────────┘
//! ```

mod envelope;
mod key;

pub use envelope::{Envelope, ENCRYPTION_OVERHEAD, NONCE_SIZE, TAG_SIZE};
pub use key::{generate_key, load_or_create_key_file, resolve_envelope, EncryptionKey, KEY_SIZE};
