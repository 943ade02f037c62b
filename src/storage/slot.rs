//! Data file slots
//!
//! Slot `i` occupies bytes `[i * block_size, (i + 1) * block_size)` and
//! holds one frame (same format as the WAL) followed by zero padding.
//! An all-zero header marks a slot that was never written.

use std::fs::File;
use std::io::ErrorKind;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

use crate::error::{Result, VaultError};
use crate::wal::{encode_frame, frame_len, BlockRecord, FrameHeader, FRAME_HEADER_SIZE};
use crate::BlockId;

/// Fixed-size slot geometry
#[derive(Debug, Clone, Copy)]
pub struct SlotLayout {
    block_size: usize,
}

impl SlotLayout {
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Byte offset of slot `id`, `None` if it lies beyond addressable space
    pub fn offset(&self, id: BlockId) -> Option<u64> {
        id.checked_mul(self.block_size as u64)
    }

    /// Largest record body a slot can carry
    pub fn max_body_len(&self) -> usize {
        self.block_size - FRAME_HEADER_SIZE
    }

    /// Encode `record` into a full, zero-padded slot
    pub fn encode(&self, record: &BlockRecord) -> Result<Vec<u8>> {
        let size = frame_len(record.encoded_len());
        if size > self.block_size {
            return Err(VaultError::BlockTooLarge {
                size,
                max: self.block_size,
            });
        }

        let mut slot = encode_frame(&record.encode());
        slot.resize(self.block_size, 0);
        Ok(slot)
    }

    /// Decode the slot bytes read for `id`
    ///
    /// `bytes` may be shorter than a full slot when it is the last one in
    /// the file.
    pub fn decode(&self, id: BlockId, bytes: &[u8]) -> Result<BlockRecord> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(VaultError::BlockNotFound(id));
        }

        let header = FrameHeader::parse(bytes)?;
        if header.len == 0 {
            return Err(VaultError::BlockNotFound(id));
        }

        let len = header.len as usize;
        if len > self.max_body_len() || FRAME_HEADER_SIZE + len > bytes.len() {
            return Err(VaultError::Framing(format!(
                "slot {} declares {} bytes, only {} available",
                id,
                len,
                bytes.len().saturating_sub(FRAME_HEADER_SIZE)
            )));
        }

        let body = &bytes[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len];
        header.verify(body)?;

        let record = BlockRecord::decode(body)?;
        if record.block_id != id {
            return Err(VaultError::Framing(format!(
                "slot {} holds a record for block {}",
                id, record.block_id
            )));
        }
        Ok(record)
    }
}

// =============================================================================
// Positional I/O
// =============================================================================

/// Write `bytes` at `offset` without moving any shared cursor
pub fn write_at(file: &File, bytes: &[u8], offset: u64) -> Result<()> {
    #[cfg(unix)]
    {
        file.write_all_at(bytes, offset)?;
    }
    #[cfg(windows)]
    {
        let mut written = 0;
        while written < bytes.len() {
            let n = file.seek_write(&bytes[written..], offset + written as u64)?;
            if n == 0 {
                return Err(std::io::Error::from(ErrorKind::WriteZero).into());
            }
            written += n;
        }
    }
    Ok(())
}

/// Read up to `buf.len()` bytes at `offset`, returning how many were read
///
/// Stops early only at end of file.
pub fn read_at(file: &File, buf: &mut [u8], offset: u64) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        #[cfg(unix)]
        let result = file.read_at(&mut buf[filled..], offset + filled as u64);
        #[cfg(windows)]
        let result = file.seek_read(&mut buf[filled..], offset + filled as u64);

        match result {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
