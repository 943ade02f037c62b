//! Block records
//!
//! The body carried by every WAL frame and every data slot:
//! a varint-encoded block id followed by the at-rest payload.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, VaultError};
use crate::BlockId;

/// Longest possible varint encoding of a u64
pub const MAX_VARINT_LEN: usize = 10;

/// A block id together with the bytes stored for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub block_id: BlockId,

    /// Payload exactly as persisted (ciphertext when encryption is on)
    pub payload: Vec<u8>,
}

impl BlockRecord {
    pub fn new(block_id: BlockId, payload: Vec<u8>) -> Self {
        Self { block_id, payload }
    }

    /// Size of the encoded body in bytes
    pub fn encoded_len(&self) -> usize {
        varint_len(self.block_id) + self.payload.len()
    }

    /// Encode as `varint(block_id) ‖ payload`
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        put_varint(&mut buf, self.block_id);
        buf.put_slice(&self.payload);
        buf.to_vec()
    }

    /// Decode a body produced by [`BlockRecord::encode`]
    pub fn decode(body: &[u8]) -> Result<Self> {
        let (block_id, used) = decode_varint(body)?;
        Ok(Self {
            block_id,
            payload: body[used..].to_vec(),
        })
    }
}

// =============================================================================
// Varint (LEB128, least-significant group first)
// =============================================================================

/// Number of bytes `value` occupies as a varint
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Append `value` to `buf` as a varint
pub fn put_varint(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Encode `value` as a standalone varint
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(value));
    put_varint(&mut buf, value);
    buf
}

/// Decode a varint from the front of `bytes`
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;

    for (i, &byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        let group = (byte & 0x7F) as u64;
        let shift = 7 * i as u32;

        // The tenth byte may only contribute the top bit of a u64
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(VaultError::Framing("varint overflows u64".to_string()));
        }

        value |= group << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    if bytes.len() >= MAX_VARINT_LEN {
        Err(VaultError::Framing("varint overflows u64".to_string()))
    } else {
        Err(VaultError::Framing("truncated varint".to_string()))
    }
}
