//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a missing, empty or clean WAL
//! - Truncation of an incomplete trailing record
//! - Corruption in the middle of the log is fatal, including a damaged
//!   length that runs past the end of the file
//! - Verify mode (stats only, file untouched)

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use vaultblock::config::WalSyncStrategy;
use vaultblock::wal::{encode_frame, BlockRecord, WalRecovery, WalWriter, FRAME_HEADER_SIZE};
use vaultblock::VaultError;

// =============================================================================
// Helper Functions
// =============================================================================

const MAX_BODY: usize = 4096 - FRAME_HEADER_SIZE;

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

/// Write records using WalWriter (produces a well-formed WAL)
fn write_records_via_writer(path: &PathBuf, count: u64) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite, MAX_BODY).unwrap();
    for i in 0..count {
        writer
            .append(&BlockRecord::new(i, format!("value{}", i).into_bytes()))
            .unwrap();
    }
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();

    assert!(records.is_empty());
    assert_eq!(result.records_recovered, 0);
    assert_eq!(result.last_block_id, None);
    assert!(!wal_path.exists());
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();

    assert!(records.is_empty());
    assert_eq!(result.records_recovered, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_records() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 10);

    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();

    assert_eq!(records.len(), 10);
    assert_eq!(result.records_recovered, 10);
    assert_eq!(result.last_block_id, Some(9));
    assert!(!result.was_truncated);

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.block_id, i as u64);
        assert_eq!(record.payload, format!("value{}", i).into_bytes());
    }
}

#[test]
fn test_recover_keeps_log_order_for_repeated_ids() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, MAX_BODY).unwrap();
        writer.append(&BlockRecord::new(4, b"v1".to_vec())).unwrap();
        writer.append(&BlockRecord::new(2, b"other".to_vec())).unwrap();
        writer.append(&BlockRecord::new(4, b"v2".to_vec())).unwrap();
    }

    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();

    let ids: Vec<_> = records.iter().map(|r| r.block_id).collect();
    assert_eq!(ids, vec![4, 2, 4]);
    assert_eq!(records[2].payload, b"v2");
    assert_eq!(result.last_block_id, Some(4));
}

// =============================================================================
// Recover: Torn Tail Tests (was_truncated = true)
// =============================================================================

#[test]
fn test_recover_truncates_partial_header() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 2);
    let clean_len = std::fs::metadata(&wal_path).unwrap().len();
    append_raw(&wal_path, &[0x20, 0x00, 0x00]);

    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();

    assert_eq!(records.len(), 2);
    assert!(result.was_truncated);
    assert_eq!(result.bytes_truncated, 3);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_recover_truncates_partial_body() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 1);
    let clean_len = std::fs::metadata(&wal_path).unwrap().len();

    let torn = encode_frame(&BlockRecord::new(1, vec![1u8; 200]).encode());
    append_raw(&wal_path, &torn[..100]);

    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();

    assert_eq!(records.len(), 1);
    assert!(result.was_truncated);
    assert_eq!(result.bytes_truncated, 100);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), clean_len);

    // Appends after repair land on a clean boundary
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, MAX_BODY).unwrap();
        writer.append(&BlockRecord::new(1, b"retry".to_vec())).unwrap();
    }
    let (records, result) = WalRecovery::recover(&wal_path, MAX_BODY).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].payload, b"retry");
    assert!(!result.was_truncated);
}

// =============================================================================
// Recover: Corruption Tests (fatal)
// =============================================================================

#[test]
fn test_recover_fails_on_corrupted_middle_record() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 3);

    // Flip a payload byte in the first record
    let mut bytes = std::fs::read(&wal_path).unwrap();
    bytes[10] ^= 0xFF;
    std::fs::write(&wal_path, &bytes).unwrap();

    let result = WalRecovery::recover(&wal_path, MAX_BODY);

    assert!(matches!(result, Err(VaultError::Framing(_))));
    // Nothing was cut off
    assert_eq!(std::fs::read(&wal_path).unwrap(), bytes);
}

#[test]
fn test_recover_fails_on_oversized_length() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&u32::MAX.to_le_bytes()).unwrap();
    file.write_all(&[0u8; 4]).unwrap();
    file.write_all(&[0u8; 64]).unwrap();

    let result = WalRecovery::recover(&wal_path, MAX_BODY);

    assert!(matches!(result, Err(VaultError::Framing(_))));
}

#[test]
fn test_recover_fails_on_length_above_slot_limit() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 2);
    // Last frame claims one byte more than a slot can carry
    let mut header = ((MAX_BODY + 1) as u32).to_le_bytes().to_vec();
    header.extend_from_slice(&[0u8; 4]);
    append_raw(&wal_path, &header);
    append_raw(&wal_path, &[0u8; 32]);
    let before = std::fs::read(&wal_path).unwrap();

    let result = WalRecovery::recover(&wal_path, MAX_BODY);

    assert!(matches!(result, Err(VaultError::Framing(_))));
    assert_eq!(std::fs::read(&wal_path).unwrap(), before);
}

#[test]
fn test_recover_fails_on_damaged_length_of_first_record() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 3);

    // Within the slot limit, but past the end of the file
    let mut bytes = std::fs::read(&wal_path).unwrap();
    bytes[0..4].copy_from_slice(&1000u32.to_le_bytes());
    std::fs::write(&wal_path, &bytes).unwrap();

    let result = WalRecovery::recover(&wal_path, MAX_BODY);

    assert!(matches!(result, Err(VaultError::Framing(_))));
    // Later records were not cut off
    assert_eq!(std::fs::read(&wal_path).unwrap(), bytes);
}

#[test]
fn test_verify_reports_damaged_length() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 2);

    let mut bytes = std::fs::read(&wal_path).unwrap();
    bytes[0..4].copy_from_slice(&500u32.to_le_bytes());
    std::fs::write(&wal_path, &bytes).unwrap();

    assert!(matches!(
        WalRecovery::verify(&wal_path, MAX_BODY),
        Err(VaultError::Framing(_))
    ));
}

#[test]
fn test_recover_fails_on_bad_varint() {
    let (_temp, wal_path) = setup_temp_wal();
    // Valid frame whose body is an unterminated varint
    File::create(&wal_path)
        .unwrap()
        .write_all(&encode_frame(&[0x80, 0x80]))
        .unwrap();

    let result = WalRecovery::recover(&wal_path, MAX_BODY);

    assert!(matches!(result, Err(VaultError::Framing(_))));
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records_via_writer(&wal_path, 2);
    append_raw(&wal_path, &[1, 2, 3, 4, 5]);
    let before = std::fs::read(&wal_path).unwrap();

    let result = WalRecovery::verify(&wal_path, MAX_BODY).unwrap();

    assert_eq!(result.records_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(result.bytes_truncated, 5);
    assert_eq!(std::fs::read(&wal_path).unwrap(), before);
}
