//! WAL Reader
//!
//! Sequential scan of the WAL from offset zero. Record boundaries come
//! from the length prefix alone, never from how much a read returned.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, VaultError};

use super::frame::{decode_frame, FrameHeader, FRAME_HEADER_SIZE};
use super::BlockRecord;

/// Outcome of reading one frame
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete, checksum-valid record body
    Record(Vec<u8>),

    /// Clean end of log
    End,

    /// The log ends partway through a frame starting at `offset`
    TornTail { offset: u64 },
}

/// Reads framed records from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset of the next unread frame
    position: u64,

    /// Largest body a frame may declare
    max_body: usize,
}

impl WalReader {
    /// Open a WAL file for reading
    ///
    /// `max_body` is the largest record body one data slot can hold;
    /// a frame declaring more is corrupt.
    pub fn open(path: &Path, max_body: usize) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            max_body,
        })
    }

    /// Offset of the next unread frame
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next frame
    ///
    /// Checksum and length violations are errors. Running out of bytes
    /// partway through a frame is reported as [`ReadOutcome::TornTail`]
    /// only if that frame is the last one in the file: when a complete
    /// record still follows, the length field itself is damaged and the
    /// frame is a framing error.
    pub fn next_frame(&mut self) -> Result<ReadOutcome> {
        let start = self.position;

        let mut header_buf = [0u8; FRAME_HEADER_SIZE];
        match read_full(&mut self.reader, &mut header_buf)? {
            0 => return Ok(ReadOutcome::End),
            n if n < FRAME_HEADER_SIZE => return Ok(ReadOutcome::TornTail { offset: start }),
            _ => {}
        }

        let header = FrameHeader::parse(&header_buf)?;
        let len = header.body_len(self.max_body).map_err(|e| at_offset(e, start))?;

        let mut body = vec![0u8; len];
        let read = read_full(&mut self.reader, &mut body)?;
        if read < len {
            // `body[..read]` is everything left in the file
            let body_start = start + FRAME_HEADER_SIZE as u64;
            if let Some(next) = first_complete_record(&body[..read], self.max_body) {
                return Err(VaultError::Framing(format!(
                    "record at offset {} declares {} bytes, but a complete record starts at offset {}",
                    start,
                    len,
                    body_start + next as u64
                )));
            }
            return Ok(ReadOutcome::TornTail { offset: start });
        }
        header.verify(&body).map_err(|e| at_offset(e, start))?;

        self.position = start + (FRAME_HEADER_SIZE + len) as u64;
        Ok(ReadOutcome::Record(body))
    }

    /// Read the next record, treating a torn tail as a framing error
    pub fn next_record(&mut self) -> Result<Option<BlockRecord>> {
        match self.next_frame()? {
            ReadOutcome::Record(body) => Ok(Some(BlockRecord::decode(&body)?)),
            ReadOutcome::End => Ok(None),
            ReadOutcome::TornTail { offset } => Err(VaultError::Framing(format!(
                "incomplete record at offset {}",
                offset
            ))),
        }
    }

    /// Read every record in log order
    pub fn read_all(mut self) -> Result<Vec<BlockRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Iterate over all records
    pub fn records(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL records; stops after the first error
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<BlockRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Position of the first complete, checksum-valid record in `tail`
///
/// A genuine body is at least one byte long, so the scan starts at 1.
fn first_complete_record(tail: &[u8], max_body: usize) -> Option<usize> {
    (1..tail.len()).find(|&pos| {
        decode_frame(&tail[pos..], max_body)
            .and_then(|(body, _)| BlockRecord::decode(body))
            .is_ok()
    })
}

fn at_offset(err: VaultError, offset: u64) -> VaultError {
    match err {
        VaultError::Framing(msg) => VaultError::Framing(format!("{} (record at offset {})", msg, offset)),
        other => other,
    }
}
