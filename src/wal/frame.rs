//! Length-prefixed frames
//!
//! Every WAL record and every data slot starts with the same header:
//! body length and CRC32 of the body, both little-endian u32.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, VaultError};

/// Header size: 4 bytes length + 4 bytes CRC
pub const FRAME_HEADER_SIZE: usize = 8;

/// Parsed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub len: u32,
    pub crc: u32,
}

impl FrameHeader {
    /// Parse a header from the first [`FRAME_HEADER_SIZE`] bytes
    pub fn parse(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(VaultError::Framing(format!(
                "frame header needs {} bytes, got {}",
                FRAME_HEADER_SIZE,
                bytes.len()
            )));
        }
        let len = bytes.get_u32_le();
        let crc = bytes.get_u32_le();
        Ok(Self { len, crc })
    }

    /// Body length, rejecting empty bodies and bodies over `max_body`
    ///
    /// `max_body` is the largest body one data slot can hold, so no
    /// genuine record ever declares more.
    pub fn body_len(&self, max_body: usize) -> Result<usize> {
        let len = self.len as usize;
        if len == 0 {
            return Err(VaultError::Framing("frame declares an empty body".to_string()));
        }
        if len > max_body {
            return Err(VaultError::Framing(format!(
                "frame declares {} bytes, limit is {}",
                len, max_body
            )));
        }
        Ok(len)
    }

    /// Check `body` against the stored checksum
    pub fn verify(&self, body: &[u8]) -> Result<()> {
        let actual = crc32fast::hash(body);
        if actual != self.crc {
            return Err(VaultError::Framing(format!(
                "checksum mismatch: expected {:#010x}, got {:#010x}",
                self.crc, actual
            )));
        }
        Ok(())
    }
}

/// Total encoded size of a frame carrying `body_len` bytes
pub fn frame_len(body_len: usize) -> usize {
    FRAME_HEADER_SIZE + body_len
}

/// Wrap `body` in a frame
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(frame_len(body.len()));
    buf.put_u32_le(body.len() as u32);
    buf.put_u32_le(crc32fast::hash(body));
    buf.put_slice(body);
    buf.to_vec()
}

/// Decode one complete frame from the front of `bytes`
///
/// Returns the body and the number of bytes consumed.
pub fn decode_frame(bytes: &[u8], max_body: usize) -> Result<(&[u8], usize)> {
    let header = FrameHeader::parse(bytes)?;
    let len = header.body_len(max_body)?;
    let end = FRAME_HEADER_SIZE + len;
    if bytes.len() < end {
        return Err(VaultError::Framing(format!(
            "frame body truncated: need {} bytes, have {}",
            len,
            bytes.len() - FRAME_HEADER_SIZE
        )));
    }
    let body = &bytes[FRAME_HEADER_SIZE..end];
    header.verify(body)?;
    Ok((body, end))
}
