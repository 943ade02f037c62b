//! WAL Writer
//!
//! Handles appending framed records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::WalSyncStrategy;
use crate::error::{Result, VaultError};

use super::frame::encode_frame;
use super::BlockRecord;

/// Appends records to the WAL file
pub struct WalWriter {
    file: File,
    sync_strategy: WalSyncStrategy,

    /// Largest record body a frame may carry
    max_body: usize,

    /// End of the last complete record (bytes)
    end_offset: u64,
}

impl WalWriter {
    /// Open or create a WAL file, positioned at its end
    ///
    /// The file must end on a record boundary; run
    /// [`WalRecovery::recover`](super::WalRecovery::recover) first.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, max_body: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let end_offset = file.metadata()?.len();

        Ok(Self {
            file,
            sync_strategy,
            max_body,
            end_offset,
        })
    }

    /// Append a record and make it durable per the sync strategy
    ///
    /// Returns the byte offset at which the record's frame starts. On
    /// failure the log is cut back to where it was, so a later append
    /// never lands behind a partial frame.
    pub fn append(&mut self, record: &BlockRecord) -> Result<u64> {
        let body = record.encode();
        if body.len() > self.max_body {
            return Err(VaultError::BlockTooLarge {
                size: body.len(),
                max: self.max_body,
            });
        }

        let frame = encode_frame(&body);
        let offset = self.end_offset;

        if let Err(e) = self.write_frame(&frame) {
            return Err(self.discard_partial(e));
        }

        self.end_offset += frame.len() as u64;
        Ok(offset)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// Current size of the log in bytes
    pub fn len(&self) -> u64 {
        self.end_offset
    }

    pub fn is_empty(&self) -> bool {
        self.end_offset == 0
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        // One write call per frame keeps a torn append confined to the tail
        self.file.write_all(frame)?;
        self.file.flush()?;
        if self.sync_strategy == WalSyncStrategy::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Drop whatever a failed append left past the last complete record
    fn discard_partial(&mut self, cause: VaultError) -> VaultError {
        match self.file.set_len(self.end_offset) {
            Ok(()) => tracing::warn!(
                end_offset = self.end_offset,
                error = %cause,
                "WAL append failed, discarded partial record"
            ),
            Err(e) => tracing::error!(
                end_offset = self.end_offset,
                error = %e,
                "WAL append failed and the partial record could not be discarded"
            ),
        }
        cause
    }
}
