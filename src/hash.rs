//! Hash scheme: canonical value encoding + double hashing.
//!
//! A value is first flattened to a canonical byte string (1 tag byte per
//! node, LE payloads, length-prefixed where needed), then hashed twice with
//! seeded xxhash64. The k-th bit position is (h1 + i*h2) mod num_bits —
//! enhanced double hashing, which behaves like k independent hash functions
//! while computing only two digests.
//!
//! The encoding is stable across process restarts for every variant except
//! [`Value::Opaque`], whose payload is an identity token supplied by the
//! caller (e.g. an object address). Opaque values hashing differently in
//! another process is an accepted property, not a defect.

use std::hash::Hasher;
use twox_hash::XxHash64;

// Canonical encoding tags. Persisted filters depend on these staying fixed:
// changing a tag silently changes every bit position for that variant.
const TAG_TEXT: u8 = 0x01;
const TAG_BYTES: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_UINT: u8 = 0x04;
const TAG_FLOAT: u8 = 0x05;
const TAG_TUPLE: u8 = 0x06;
const TAG_OPAQUE: u8 = 0x07;

/// A hashable value, as a closed tagged variant (no runtime type
/// inspection). Composite values nest via [`Value::Tuple`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    Int(i64),
    Uint(u64),
    Float(f64),
    Tuple(&'a [Value<'a>]),
    /// Identity-based fallback for values with no by-value encoding.
    Opaque(u64),
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(v)
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(v: &'a String) -> Self {
        Value::Text(v.as_str())
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(v)
    }
}

impl<'a> From<i64> for Value<'a> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl<'a> From<i32> for Value<'a> {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl<'a> From<u64> for Value<'a> {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl<'a> From<u32> for Value<'a> {
    fn from(v: u32) -> Self {
        Value::Uint(v as u64)
    }
}

impl<'a> From<f64> for Value<'a> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Append the canonical byte encoding of `v` to `out`.
///
/// Text/Bytes are length-prefixed (LE u32) so tuple elements cannot run
/// into each other; floats hash by IEEE bit pattern.
pub fn canonical_bytes(v: &Value, out: &mut Vec<u8>) {
    match v {
        Value::Text(s) => {
            out.push(TAG_TEXT);
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
        Value::Int(i) => {
            out.push(TAG_INT);
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::Uint(u) => {
            out.push(TAG_UINT);
            out.extend_from_slice(&u.to_le_bytes());
        }
        Value::Float(f) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        Value::Tuple(items) => {
            out.push(TAG_TUPLE);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items.iter() {
                canonical_bytes(item, out);
            }
        }
        Value::Opaque(id) => {
            out.push(TAG_OPAQUE);
            out.extend_from_slice(&id.to_le_bytes());
        }
    }
}

#[inline]
pub fn xxh64(data: &[u8], seed: u64) -> u64 {
    let mut h = XxHash64::with_seed(seed);
    h.write(data);
    h.finish()
}

/// Both base digests of a value under the given seed pair.
pub fn value_digests(v: &Value, seeds: [u64; 2]) -> (u64, u64) {
    let mut buf = Vec::with_capacity(32);
    canonical_bytes(v, &mut buf);
    (xxh64(&buf, seeds[0]), xxh64(&buf, seeds[1]))
}

/// The k bit positions derived from two digests.
#[inline]
pub fn bit_positions(
    h1: u64,
    h2: u64,
    num_hashes: u32,
    num_bits: u64,
) -> impl Iterator<Item = u64> {
    (0..num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
}
