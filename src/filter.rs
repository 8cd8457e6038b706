//! The externally usable filter object: parameters + bit store + hash
//! scheme, with set algebra and serialization on top.
//!
//! A filter is in exactly one of three states, fixed at construction:
//! anonymous (in-memory, always writable), file-backed read-write, or
//! file-backed read-only. There is no in-place "attach a path" transition —
//! an anonymous filter becomes file-backed only through `copy_template` or
//! `from_base64` on its serialized form, each of which yields a new
//! instance.

use log::debug;
use std::fmt;
use std::path::Path;

use crate::error::{BloomError, Result};
use crate::format;
use crate::hash::{bit_positions, value_digests, Value};
use crate::params::{FilterParameters, SeedSpec};
use crate::store::{BitStore, OpenMode};

/// Optional knobs for file-backed creation.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Unix permission bits for the new file (process umask applies when
    /// None). Ignored on non-unix targets.
    pub perm: Option<u32>,
    /// Single seed, expanded to a deterministic pair. Two filters created
    /// with the same seed are union/intersection compatible.
    pub seed: Option<u64>,
    /// Explicit seed pair; wins over `seed`.
    pub seeds: Option<[u64; 2]>,
}

impl CreateOptions {
    fn seed_spec(&self) -> SeedSpec {
        if let Some(pair) = self.seeds {
            SeedSpec::Pair(pair)
        } else if let Some(s) = self.seed {
            SeedSpec::Single(s)
        } else {
            SeedSpec::Random
        }
    }
}

/// A persistent, mmap-backed (or anonymous in-memory) Bloom filter.
#[derive(Debug)]
pub struct BloomFilter {
    params: FilterParameters,
    store: BitStore,
}

impl BloomFilter {
    // ---------- construction ----------

    /// Anonymous in-memory filter with randomly drawn seeds.
    pub fn new(capacity: u64, error_rate: f64) -> Result<Self> {
        Self::new_with(capacity, error_rate, SeedSpec::Random)
    }

    /// Anonymous filter with a deterministic seed (reproducible across
    /// runs; two filters sharing the seed are compatible).
    pub fn new_with_seed(capacity: u64, error_rate: f64, seed: u64) -> Result<Self> {
        Self::new_with(capacity, error_rate, SeedSpec::Single(seed))
    }

    /// Anonymous filter with explicit seed selection.
    pub fn new_with(capacity: u64, error_rate: f64, seeds: SeedSpec) -> Result<Self> {
        let params = FilterParameters::derive(capacity, error_rate, seeds)?;
        let store = BitStore::anon(params.num_bits);
        Ok(Self { params, store })
    }

    /// Create a file-backed filter at `path` (header + zeroed bit region).
    /// Fails with an i/o error if the containing directory is missing or
    /// the path is not writable.
    pub fn create(capacity: u64, error_rate: f64, path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(capacity, error_rate, path, &CreateOptions::default())
    }

    /// `create` with permission bits and/or explicit seeds.
    pub fn create_with(
        capacity: u64,
        error_rate: f64,
        path: impl AsRef<Path>,
        opts: &CreateOptions,
    ) -> Result<Self> {
        let params = FilterParameters::derive(capacity, error_rate, opts.seed_spec())?;
        let path = path.as_ref().to_path_buf();
        let file = format::write_filter_file(&path, &params, None, opts.perm)?;
        let store = BitStore::map_rw(file, path, params.num_bits)?;
        Ok(Self { params, store })
    }

    /// Open an existing filter file read-write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, OpenMode::ReadWrite)
    }

    /// Open an existing filter file read-only. Mutating calls on the result
    /// fail with a read-only error; reads behave normally.
    pub fn open_ro(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, OpenMode::ReadOnly)
    }

    /// Open with an explicit access mode. The mode is fixed for the
    /// lifetime of the instance; re-open to get a different one.
    pub fn open_with_mode(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, params) = format::open_filter_file(&path, mode)?;
        let store = match mode {
            OpenMode::ReadWrite => BitStore::map_rw(file, path, params.num_bits)?,
            OpenMode::ReadOnly => BitStore::map_ro(file, path, params.num_bits)?,
        };
        Ok(Self { params, store })
    }

    /// Decode a base64 blob (see [`BloomFilter::to_base64`]) into a new
    /// read-write file-backed filter at `path`.
    pub fn from_base64(path: impl AsRef<Path>, blob: &str) -> Result<Self> {
        Self::from_base64_with(path, blob, None)
    }

    /// `from_base64` with permission bits for the new file.
    pub fn from_base64_with(
        path: impl AsRef<Path>,
        blob: &str,
        perm: Option<u32>,
    ) -> Result<Self> {
        let (params, bits) = format::decode_blob(blob)?;
        let path = path.as_ref().to_path_buf();
        let file = format::write_filter_file(&path, &params, Some(&bits), perm)?;
        let store = BitStore::map_rw(file, path, params.num_bits)?;
        debug!("decoded base64 filter ({} bits)", params.num_bits);
        Ok(Self { params, store })
    }

    // ---------- membership ----------

    /// Insert a value. Idempotent; never fails except on a read-only
    /// filter.
    pub fn insert<'a, V: Into<Value<'a>>>(&mut self, value: V) -> Result<()> {
        self.insert_value(&value.into())
    }

    /// Insert an explicitly tagged value (use this for tuples/opaque ids).
    pub fn insert_value(&mut self, value: &Value<'_>) -> Result<()> {
        self.require_writable("insert")?;
        let (h1, h2) = value_digests(value, self.params.hash_seeds);
        for pos in bit_positions(h1, h2, self.params.num_hashes, self.params.num_bits) {
            self.store.set(pos)?;
        }
        Ok(())
    }

    /// Bulk insert.
    pub fn update<'a, I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value<'a>>,
    {
        for v in values {
            self.insert(v)?;
        }
        Ok(())
    }

    /// Membership test: true iff every derived bit is set. Never a false
    /// negative for an inserted value; false positives occur at roughly the
    /// configured error rate while within capacity.
    pub fn contains<'a, V: Into<Value<'a>>>(&self, value: V) -> bool {
        self.contains_value(&value.into())
    }

    pub fn contains_value(&self, value: &Value<'_>) -> bool {
        let (h1, h2) = value_digests(value, self.params.hash_seeds);
        bit_positions(h1, h2, self.params.num_hashes, self.params.num_bits)
            .all(|pos| self.store.get(pos))
    }

    // ---------- set algebra ----------

    /// Bitwise OR of `other` into self. Both filters must share identical
    /// parameters (including seeds); compatibility is checked before any
    /// bit is touched, so a failed union leaves both operands unmodified.
    pub fn union(&mut self, other: &BloomFilter) -> Result<()> {
        self.check_compatible(other)?;
        self.require_writable("union")?;
        let dst = self.store.bytes_mut("union")?;
        for (d, s) in dst.iter_mut().zip(other.store.bytes()) {
            *d |= *s;
        }
        Ok(())
    }

    /// Bitwise AND of `other` into self, under the same compatibility and
    /// write-access rules as [`BloomFilter::union`].
    pub fn intersection(&mut self, other: &BloomFilter) -> Result<()> {
        self.check_compatible(other)?;
        self.require_writable("intersection")?;
        let dst = self.store.bytes_mut("intersection")?;
        for (d, s) in dst.iter_mut().zip(other.store.bytes()) {
            *d &= *s;
        }
        Ok(())
    }

    /// Zero the whole bit region.
    pub fn clear_all(&mut self) -> Result<()> {
        self.require_writable("clear_all")?;
        self.store.clear_all()
    }

    /// Durability barrier for file-backed filters; no-op for anonymous
    /// ones. Nothing else guarantees dirty pages reach stable storage.
    pub fn sync(&self) -> Result<()> {
        self.store.flush()
    }

    // ---------- duplication / serialization ----------

    /// Materialize a new read-write file at `new_path` with identical
    /// header and identical bit contents. Anonymous filters have no file
    /// semantics to copy and fail with an unsupported-operation error.
    pub fn copy(&self, new_path: impl AsRef<Path>) -> Result<Self> {
        self.copy_with(new_path, None)
    }

    pub fn copy_with(&self, new_path: impl AsRef<Path>, perm: Option<u32>) -> Result<Self> {
        if !self.store.is_file_backed() {
            return Err(BloomError::Unsupported { op: "copy" });
        }
        let path = new_path.as_ref().to_path_buf();
        let file = format::write_filter_file(&path, &self.params, Some(self.store.bytes()), perm)?;
        let store = BitStore::map_rw(file, path, self.params.num_bits)?;
        Ok(Self {
            params: self.params,
            store,
        })
    }

    /// Materialize a new read-write file sharing this filter's parameters
    /// but with an all-zero bit region. Works for anonymous sources too —
    /// this is the supported way to derive a compatible file-backed filter
    /// from an anonymous one for later union/intersection.
    pub fn copy_template(&self, new_path: impl AsRef<Path>) -> Result<Self> {
        self.copy_template_with(new_path, None)
    }

    pub fn copy_template_with(
        &self,
        new_path: impl AsRef<Path>,
        perm: Option<u32>,
    ) -> Result<Self> {
        let path = new_path.as_ref().to_path_buf();
        let file = format::write_filter_file(&path, &self.params, None, perm)?;
        let store = BitStore::map_rw(file, path, self.params.num_bits)?;
        Ok(Self {
            params: self.params,
            store,
        })
    }

    /// Encode header + bit region as one self-describing base64 string.
    /// File-backed filters only.
    pub fn to_base64(&self) -> Result<String> {
        if !self.store.is_file_backed() {
            return Err(BloomError::Unsupported { op: "to_base64" });
        }
        Ok(format::encode_blob(&self.params, self.store.bytes()))
    }

    // ---------- introspection ----------

    pub fn capacity(&self) -> u64 {
        self.params.capacity
    }

    pub fn error_rate(&self) -> f64 {
        self.params.error_rate
    }

    pub fn num_hashes(&self) -> u32 {
        self.params.num_hashes
    }

    pub fn num_bits(&self) -> u64 {
        self.params.num_bits
    }

    pub fn hash_seeds(&self) -> [u64; 2] {
        self.params.hash_seeds
    }

    pub fn parameters(&self) -> &FilterParameters {
        &self.params
    }

    pub fn mode(&self) -> OpenMode {
        self.store.mode()
    }

    pub fn is_file_backed(&self) -> bool {
        self.store.is_file_backed()
    }

    /// Backing file path. Fails with an unsupported-operation error on an
    /// anonymous filter instead of returning an empty value, so downstream
    /// logic cannot silently treat "no file" as a real path.
    pub fn path(&self) -> Result<&Path> {
        self.store
            .path()
            .ok_or(BloomError::Unsupported { op: "path" })
    }

    // ---------- internals ----------

    fn require_writable(&self, op: &'static str) -> Result<()> {
        match self.store.mode() {
            OpenMode::ReadWrite => Ok(()),
            OpenMode::ReadOnly => Err(BloomError::ReadOnly { op }),
        }
    }

    fn check_compatible(&self, other: &BloomFilter) -> Result<()> {
        if self.params.compatible(&other.params) {
            Ok(())
        } else {
            Err(BloomError::Incompatible(format!(
                "self {{capacity: {}, error_rate: {}, num_bits: {}, num_hashes: {}, seeds: {:?}}} \
                 vs other {{capacity: {}, error_rate: {}, num_bits: {}, num_hashes: {}, seeds: {:?}}}",
                self.params.capacity,
                self.params.error_rate,
                self.params.num_bits,
                self.params.num_hashes,
                self.params.hash_seeds,
                other.params.capacity,
                other.params.error_rate,
                other.params.num_bits,
                other.params.num_hashes,
                other.params.hash_seeds,
            )))
        }
    }
}

impl fmt::Display for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<BloomFilter capacity: {}, error: {:.3}, num_hashes: {}>",
            self.params.capacity, self.params.error_rate, self.params.num_hashes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_insert_and_contains() {
        let mut bf = BloomFilter::new(100, 0.01).unwrap();
        bf.insert("test").unwrap();
        bf.insert(1234i64).unwrap();
        bf.insert(1.2f64).unwrap();
        bf.insert_value(&Value::Tuple(&[Value::Int(1), Value::Int(2)]))
            .unwrap();

        assert!(bf.contains("test"));
        assert!(bf.contains(1234i64));
        assert!(bf.contains(1.2f64));
        assert!(bf.contains_value(&Value::Tuple(&[Value::Int(1), Value::Int(2)])));
    }

    #[test]
    fn clear_all_empties_anonymous_filter() {
        let mut bf = BloomFilter::new(100, 0.01).unwrap();
        bf.insert("gone").unwrap();
        bf.clear_all().unwrap();
        assert!(!bf.contains("gone"));
    }

    #[test]
    fn anonymous_filter_has_no_file_operations() {
        let bf = BloomFilter::new(100, 0.01).unwrap();
        assert!(matches!(
            bf.path(),
            Err(BloomError::Unsupported { op: "path" })
        ));
        assert!(matches!(
            bf.to_base64(),
            Err(BloomError::Unsupported { op: "to_base64" })
        ));
        let dst = std::env::temp_dir().join("bloommap-anon-copy.bloom");
        assert!(matches!(
            bf.copy(&dst),
            Err(BloomError::Unsupported { op: "copy" })
        ));
    }

    #[test]
    fn display_matches_diagnostic_format() {
        let bf = BloomFilter::new_with_seed(200, 0.001, 7).unwrap();
        assert_eq!(
            bf.to_string(),
            format!(
                "<BloomFilter capacity: 200, error: 0.001, num_hashes: {}>",
                bf.num_hashes()
            )
        );
    }

    #[test]
    fn construction_rejects_bad_arguments() {
        assert!(matches!(
            BloomFilter::new(0, 0.01),
            Err(BloomError::InvalidArgument(_))
        ));
        assert!(matches!(
            BloomFilter::new(100, 1.5),
            Err(BloomError::InvalidArgument(_))
        ));
    }
}
