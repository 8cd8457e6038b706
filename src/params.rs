//! Parameter derivation for a filter.
//!
//! Sizing follows the standard Bloom math:
//! - num_bits   = ceil(-capacity * ln(error_rate) / ln(2)^2)
//! - num_hashes = max(1, round((num_bits / capacity) * ln 2))
//!
//! Seeds:
//! - An explicit pair is used verbatim (the reproducible path — two filters
//!   built with the same pair are union/intersection compatible).
//! - A single u64 seed expands to a pair via splitmix64, so `seed=100` on
//!   two filters still yields compatible instances.
//! - With no seed given, both values come from process-local randomness and
//!   the filter is only compatible with its own copies/templates.
//!
//! An opened or deserialized filter always restores the persisted pair
//! exactly; derivation runs only at fresh creation.

use crate::error::{BloomError, Result};

/// How hash seeds are chosen at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSpec {
    /// Draw both seeds from process-local randomness.
    Random,
    /// Expand one u64 into a deterministic pair.
    Single(u64),
    /// Use the pair verbatim.
    Pair([u64; 2]),
}

/// Immutable sizing and hashing parameters of a filter.
///
/// Two filters may take part in union/intersection iff every field here is
/// equal (see [`FilterParameters::compatible`]).
#[derive(Debug, Clone, Copy)]
pub struct FilterParameters {
    pub capacity: u64,
    pub error_rate: f64,
    pub num_bits: u64,
    pub num_hashes: u32,
    pub hash_seeds: [u64; 2],
}

impl FilterParameters {
    /// Derive parameters for a fresh filter. Rejects capacity == 0 and
    /// error rates outside (0, 1); NaN is rejected by the same range check.
    pub fn derive(capacity: u64, error_rate: f64, seeds: SeedSpec) -> Result<Self> {
        validate(capacity, error_rate)?;

        let ln2 = std::f64::consts::LN_2;
        let bits = (-(capacity as f64) * error_rate.ln() / (ln2 * ln2)).ceil();
        let num_bits = (bits as u64).max(1);
        let num_hashes = (((num_bits as f64 / capacity as f64) * ln2).round() as u32).max(1);

        let hash_seeds = match seeds {
            SeedSpec::Random => [rand::random::<u64>(), rand::random::<u64>()],
            SeedSpec::Single(s) => [s, splitmix64(s)],
            SeedSpec::Pair(pair) => pair,
        };

        Ok(Self {
            capacity,
            error_rate,
            num_bits,
            num_hashes,
            hash_seeds,
        })
    }

    /// Bytes needed for the bit region: ceil(num_bits / 8).
    #[inline]
    pub fn byte_len(&self) -> usize {
        ((self.num_bits + 7) / 8) as usize
    }

    /// Compatibility predicate gating union/intersection. The error rate is
    /// compared by bit pattern: values round-trip through the file header
    /// bit-exactly, so an equality this strict is safe and avoids epsilon
    /// policy questions.
    pub fn compatible(&self, other: &FilterParameters) -> bool {
        self.capacity == other.capacity
            && self.error_rate.to_bits() == other.error_rate.to_bits()
            && self.num_bits == other.num_bits
            && self.num_hashes == other.num_hashes
            && self.hash_seeds == other.hash_seeds
    }
}

/// Validate user-supplied construction arguments.
pub fn validate(capacity: u64, error_rate: f64) -> Result<()> {
    if capacity == 0 {
        return Err(BloomError::InvalidArgument(
            "capacity must be > 0".to_string(),
        ));
    }
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(BloomError::InvalidArgument(format!(
            "error_rate must be in (0, 1), got {}",
            error_rate
        )));
    }
    Ok(())
}

/// splitmix64 finalizer; used to expand a single user seed into a second
/// independent one.
#[inline]
pub(crate) fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
