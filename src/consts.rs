//! On-disk format constants for the filter file.
//!
//! Layout (LE):
//! - Header (64 B) v1:
//!   [magic8="RBLOOM1\0"]
//!   [version u32=1]
//!   [header_len u32=64]
//!   [capacity u64]
//!   [error_rate f64]
//!   [num_hashes u32]
//!   [reserved u32=0]
//!   [num_bits u64]
//!   [seed1 u64]
//!   [seed2 u64]
//! - Body: ceil(num_bits / 8) bytes, bit i lives at byte i/8, mask 1 << (i%8).
//!
//! The header is written once at creation and never rewritten; open()
//! re-derives nothing and trusts the persisted fields after validation.

pub const MAGIC: &[u8; 8] = b"RBLOOM1\0";
pub const VERSION_V1: u32 = 1;

pub const HEADER_SIZE: usize = 64;
pub const HEADER_SIZE_U64: u64 = 64;

// Offsets inside the v1 header
pub const OFF_MAGIC: usize = 0;
pub const OFF_VERSION: usize = 8;
pub const OFF_HEADER_LEN: usize = 12;
pub const OFF_CAPACITY: usize = 16;
pub const OFF_ERROR_RATE: usize = 24;
pub const OFF_NUM_HASHES: usize = 32;
pub const OFF_RESERVED: usize = 36;
pub const OFF_NUM_BITS: usize = 40;
pub const OFF_SEED1: usize = 48;
pub const OFF_SEED2: usize = 56;

// Chunk size used when zero-filling a fresh bit region.
pub const ZERO_CHUNK: usize = 8192;
