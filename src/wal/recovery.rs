//! WAL Recovery
//!
//! Reads the whole log back at startup so it can be replayed into the
//! data file.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use crate::BlockId;

use super::reader::{ReadOutcome, WalReader};
use super::BlockRecord;

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of complete records read back
    pub records_recovered: u64,

    /// Highest block id seen in the log
    pub last_block_id: Option<BlockId>,

    /// Whether an incomplete trailing frame was cut off
    pub was_truncated: bool,

    /// Bytes removed from the end of the log
    pub bytes_truncated: u64,
}

impl WalRecovery {
    /// Recover records from a WAL file
    ///
    /// This will:
    /// 1. Read every frame from offset zero, in order
    /// 2. Fail on any checksum or varint violation, and on any frame
    ///    declaring more than `max_body` bytes
    /// 3. Cut off an incomplete frame at the very end (an append that
    ///    never returned, so it was never acknowledged). A short frame
    ///    followed by a complete record is a damaged length, not a torn
    ///    append, and fails like any other violation
    /// 4. Return all records in log order
    ///
    /// A missing file is treated as an empty log.
    pub fn recover(path: &Path, max_body: usize) -> Result<(Vec<BlockRecord>, RecoveryResult)> {
        Self::scan(path, max_body, true)
    }

    /// Same scan as [`WalRecovery::recover`] without modifying the file
    pub fn verify(path: &Path, max_body: usize) -> Result<RecoveryResult> {
        Self::scan(path, max_body, false).map(|(_, result)| result)
    }

    fn scan(
        path: &Path,
        max_body: usize,
        repair: bool,
    ) -> Result<(Vec<BlockRecord>, RecoveryResult)> {
        let mut result = RecoveryResult::default();
        if !path.exists() {
            return Ok((Vec::new(), result));
        }

        let file_len = path.metadata()?.len();
        let mut reader = WalReader::open(path, max_body)?;
        let mut records = Vec::new();

        loop {
            match reader.next_frame()? {
                ReadOutcome::Record(body) => {
                    let record = BlockRecord::decode(&body)?;
                    result.records_recovered += 1;
                    result.last_block_id = Some(
                        result
                            .last_block_id
                            .map_or(record.block_id, |last| last.max(record.block_id)),
                    );
                    records.push(record);
                }
                ReadOutcome::End => break,
                ReadOutcome::TornTail { offset } => {
                    result.was_truncated = true;
                    result.bytes_truncated = file_len - offset;
                    if repair {
                        tracing::warn!(
                            path = %path.display(),
                            offset,
                            bytes = result.bytes_truncated,
                            "Truncating incomplete record at end of WAL"
                        );
                        let file = OpenOptions::new().write(true).open(path)?;
                        file.set_len(offset)?;
                        file.sync_all()?;
                    }
                    break;
                }
            }
        }

        Ok((records, result))
    }
}
