//! Key material
//!
//! Resolves the configured [`EncryptionMode`] into a key. Key files hold
//! exactly 32 raw bytes and are created on first use.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use aes_gcm::aead::OsRng;
use rand::RngCore;

use crate::config::EncryptionMode;
use crate::error::{Result, VaultError};

use super::Envelope;

/// Key size for AES-256 (32 bytes)
pub const KEY_SIZE: usize = 32;

/// Encryption key (32 bytes for AES-256)
pub type EncryptionKey = [u8; KEY_SIZE];

/// Generate a random encryption key
pub fn generate_key() -> EncryptionKey {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}

/// Read the key stored at `path`, creating it if the file does not exist
pub fn load_or_create_key_file(path: &Path) -> Result<EncryptionKey> {
    match fs::read(path) {
        Ok(bytes) => key_from_bytes(&bytes, path),
        Err(e) if e.kind() == ErrorKind::NotFound => create_key_file(path),
        Err(e) => Err(e.into()),
    }
}

fn create_key_file(path: &Path) -> Result<EncryptionKey> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let key = generate_key();
    // create_new so two openers can never silently disagree on the key
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(&key)?;
    file.sync_all()?;

    tracing::info!(path = %path.display(), "Generated new encryption key file");
    Ok(key)
}

fn key_from_bytes(bytes: &[u8], path: &Path) -> Result<EncryptionKey> {
    bytes.try_into().map_err(|_| {
        VaultError::Encryption(format!(
            "key file {} holds {} bytes, expected {}",
            path.display(),
            bytes.len(),
            KEY_SIZE
        ))
    })
}

/// Build the envelope for `mode`, or `None` when encryption is disabled
pub fn resolve_envelope(mode: &EncryptionMode) -> Result<Option<Envelope>> {
    match mode {
        EncryptionMode::Disabled => Ok(None),
        EncryptionMode::Key(key) => Ok(Some(Envelope::new(key))),
        EncryptionMode::KeyFile(path) => {
            let key = load_or_create_key_file(path)?;
            Ok(Some(Envelope::new(&key)))
        }
    }
}
