//! Tests for WAL record and frame encoding
//!
//! These tests verify:
//! - Record body layout (varint id + payload)
//! - Frame layout (length + CRC + body)
//! - Rejection of truncated, oversized and corrupted input

use vaultblock::wal::{
    decode_frame, decode_varint, encode_frame, encode_varint, BlockRecord, FRAME_HEADER_SIZE,
    MAX_VARINT_LEN,
};
use vaultblock::VaultError;

const MAX_BODY: usize = 4096 - FRAME_HEADER_SIZE;

// =============================================================================
// Record Body Tests
// =============================================================================

#[test]
fn test_record_small_id() {
    let record = BlockRecord::new(5, b"hello".to_vec());
    let body = record.encode();

    assert_eq!(body[0], 5);
    assert_eq!(&body[1..], b"hello");
    assert_eq!(BlockRecord::decode(&body).unwrap(), record);
}

#[test]
fn test_record_multi_byte_id() {
    let record = BlockRecord::new(1 << 20, b"x".to_vec());
    let body = record.encode();

    // 2^20 needs three 7-bit groups
    assert_eq!(body.len(), 3 + 1);
    assert_eq!(BlockRecord::decode(&body).unwrap().block_id, 1 << 20);
}

#[test]
fn test_record_empty_payload() {
    let record = BlockRecord::new(0, Vec::new());
    let decoded = BlockRecord::decode(&record.encode()).unwrap();

    assert_eq!(decoded.block_id, 0);
    assert!(decoded.payload.is_empty());
}

#[test]
fn test_record_max_id() {
    let record = BlockRecord::new(u64::MAX, b"end".to_vec());
    let body = record.encode();

    assert_eq!(body.len(), MAX_VARINT_LEN + 3);
    assert_eq!(BlockRecord::decode(&body).unwrap(), record);
}

#[test]
fn test_record_decode_empty_body() {
    let result = BlockRecord::decode(&[]);
    assert!(matches!(result, Err(VaultError::Framing(_))));
}

#[test]
fn test_varint_lsb_first() {
    // 0x3FFF = 0b11_1111_1111_1111 -> low group 0x7F with continuation, then 0x7F
    assert_eq!(encode_varint(0x3FFF), vec![0xFF, 0x7F]);
    assert_eq!(decode_varint(&[0xFF, 0x7F, 0xAA]).unwrap(), (0x3FFF, 2));
}

// =============================================================================
// Frame Tests
// =============================================================================

#[test]
fn test_frame_header_describes_body() {
    let body = BlockRecord::new(7, b"payload".to_vec()).encode();
    let frame = encode_frame(&body);

    let len = u32::from_le_bytes(frame[0..4].try_into().unwrap());
    assert_eq!(len as usize, body.len());
    assert_eq!(frame.len(), FRAME_HEADER_SIZE + body.len());
}

#[test]
fn test_frames_concatenate_unambiguously() {
    let bodies: Vec<Vec<u8>> = vec![
        BlockRecord::new(0, vec![1u8; 3]).encode(),
        BlockRecord::new(1, vec![2u8; 9000]).encode(),
        BlockRecord::new(2, vec![3u8; 1]).encode(),
    ];
    let mut stream = Vec::new();
    for body in &bodies {
        stream.extend_from_slice(&encode_frame(body));
    }

    let mut offset = 0;
    for body in &bodies {
        let (decoded, used) = decode_frame(&stream[offset..], MAX_BODY).unwrap();
        assert_eq!(decoded, body.as_slice());
        offset += used;
    }
    assert_eq!(offset, stream.len());
}

#[test]
fn test_frame_truncated_body() {
    let frame = encode_frame(b"0123456789");
    let result = decode_frame(&frame[..frame.len() - 1], MAX_BODY);

    assert!(matches!(result, Err(VaultError::Framing(_))));
}

#[test]
fn test_frame_crc_corruption() {
    let mut frame = encode_frame(b"0123456789");
    frame[5] ^= 0xFF;

    assert!(matches!(decode_frame(&frame, MAX_BODY), Err(VaultError::Framing(_))));
}

#[test]
fn test_frame_header_too_small() {
    assert!(matches!(decode_frame(&[0u8; 4], MAX_BODY), Err(VaultError::Framing(_))));
}
