//! bloommap — a persistent, memory-mappable Bloom filter.
//!
//! No false negatives, tunable false-positive rate, and a durable on-disk
//! representation that supports union/intersection and base64 serialization
//! across filters sharing identical parameters.
//!
//! ```no_run
//! use bloommap::BloomFilter;
//!
//! let mut bf = BloomFilter::create(100_000, 0.01, "/tmp/urls.bloom")?;
//! bf.insert("https://example.com/")?;
//! assert!(bf.contains("https://example.com/"));
//! bf.sync()?;
//! # Ok::<(), bloommap::BloomError>(())
//! ```

// Format + parameters
pub mod consts; // on-disk layout constants
pub mod error;
pub mod params; // capacity/error_rate -> num_bits/num_hashes/seeds

// Engine pieces
pub mod format; // header codec, file creation/open, base64 blob
pub mod hash; // canonical value encoding + double hashing
pub mod store; // anonymous or mmap-backed bit vector

// Public object
pub mod filter;

pub use error::{BloomError, Result};
pub use filter::{BloomFilter, CreateOptions};
pub use hash::Value;
pub use params::{FilterParameters, SeedSpec};
pub use store::OpenMode;
