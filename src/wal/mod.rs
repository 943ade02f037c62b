//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a record before the block reaches the data file
//! - Length prefix + CRC32 so replay finds exact record boundaries
//! - Sequential replay from offset zero at startup
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Record 1                                         │
//! │ ┌─────────┬─────────┬──────────────┬───────────┐ │
//! │ │ Len (4) │ CRC (4) │ varint(id)   │ payload   │ │
//! │ └─────────┴─────────┴──────────────┴───────────┘ │
//! ├──────────────────────────────────────────────────┤
//! │ Record 2                                         │
//! │ ┌─────────┬─────────┬──────────────┬───────────┐ │
//! │ │ Len (4) │ CRC (4) │ varint(id)   │ payload   │ │
//! │ └─────────┴─────────┴──────────────┴───────────┘ │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! `Len` counts the body (`varint(id) ‖ payload`) only. The log is never
//! truncated during normal operation and is fully replayed on every open.

mod frame;
mod reader;
mod record;
mod recovery;
mod writer;

pub use frame::{decode_frame, encode_frame, frame_len, FrameHeader, FRAME_HEADER_SIZE};
pub use reader::{ReadOutcome, WalIterator, WalReader};
pub use record::{decode_varint, encode_varint, put_varint, varint_len, BlockRecord, MAX_VARINT_LEN};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
