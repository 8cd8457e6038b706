//! File format codec: header encode/decode, filter file creation, open
//! validation, and the base64 blob used for text serialization.
//!
//! The blob is exactly the file bytes (64-byte header + bit region) through
//! standard base64 — self-describing, no outer metadata needed to decode.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::consts::{
    HEADER_SIZE, HEADER_SIZE_U64, MAGIC, OFF_CAPACITY, OFF_ERROR_RATE, OFF_HEADER_LEN, OFF_MAGIC,
    OFF_NUM_BITS, OFF_NUM_HASHES, OFF_RESERVED, OFF_SEED1, OFF_SEED2, OFF_VERSION, VERSION_V1,
    ZERO_CHUNK,
};
use crate::error::{BloomError, Result};
use crate::params::FilterParameters;
use crate::store::{byte_len, OpenMode};

/// Serialize parameters into a v1 header image.
pub fn encode_header(p: &FilterParameters) -> [u8; HEADER_SIZE] {
    let mut hdr = [0u8; HEADER_SIZE];
    hdr[OFF_MAGIC..OFF_MAGIC + 8].copy_from_slice(MAGIC);
    LittleEndian::write_u32(&mut hdr[OFF_VERSION..OFF_VERSION + 4], VERSION_V1);
    LittleEndian::write_u32(&mut hdr[OFF_HEADER_LEN..OFF_HEADER_LEN + 4], HEADER_SIZE as u32);
    LittleEndian::write_u64(&mut hdr[OFF_CAPACITY..OFF_CAPACITY + 8], p.capacity);
    LittleEndian::write_f64(&mut hdr[OFF_ERROR_RATE..OFF_ERROR_RATE + 8], p.error_rate);
    LittleEndian::write_u32(&mut hdr[OFF_NUM_HASHES..OFF_NUM_HASHES + 4], p.num_hashes);
    LittleEndian::write_u32(&mut hdr[OFF_RESERVED..OFF_RESERVED + 4], 0);
    LittleEndian::write_u64(&mut hdr[OFF_NUM_BITS..OFF_NUM_BITS + 8], p.num_bits);
    LittleEndian::write_u64(&mut hdr[OFF_SEED1..OFF_SEED1 + 8], p.hash_seeds[0]);
    LittleEndian::write_u64(&mut hdr[OFF_SEED2..OFF_SEED2 + 8], p.hash_seeds[1]);
    hdr
}

/// Parse and validate a v1 header image. Persisted fields are restored
/// verbatim (nothing is re-derived); out-of-range fields mean the file is
/// corrupt, not that the caller passed bad arguments.
pub fn decode_header(hdr: &[u8]) -> Result<FilterParameters> {
    if hdr.len() < HEADER_SIZE {
        return Err(BloomError::corrupt(format!(
            "header too short: {} bytes, expected {}",
            hdr.len(),
            HEADER_SIZE
        )));
    }
    if &hdr[OFF_MAGIC..OFF_MAGIC + 8] != MAGIC {
        return Err(BloomError::corrupt("bad magic"));
    }
    let version = LittleEndian::read_u32(&hdr[OFF_VERSION..OFF_VERSION + 4]);
    if version != VERSION_V1 {
        return Err(BloomError::corrupt(format!(
            "unsupported version {} (expected {})",
            version, VERSION_V1
        )));
    }
    let header_len = LittleEndian::read_u32(&hdr[OFF_HEADER_LEN..OFF_HEADER_LEN + 4]);
    if header_len as usize != HEADER_SIZE {
        return Err(BloomError::corrupt(format!(
            "bad header_len {} (expected {})",
            header_len, HEADER_SIZE
        )));
    }

    let capacity = LittleEndian::read_u64(&hdr[OFF_CAPACITY..OFF_CAPACITY + 8]);
    let error_rate = LittleEndian::read_f64(&hdr[OFF_ERROR_RATE..OFF_ERROR_RATE + 8]);
    let num_hashes = LittleEndian::read_u32(&hdr[OFF_NUM_HASHES..OFF_NUM_HASHES + 4]);
    let num_bits = LittleEndian::read_u64(&hdr[OFF_NUM_BITS..OFF_NUM_BITS + 8]);
    let seed1 = LittleEndian::read_u64(&hdr[OFF_SEED1..OFF_SEED1 + 8]);
    let seed2 = LittleEndian::read_u64(&hdr[OFF_SEED2..OFF_SEED2 + 8]);

    if capacity == 0 || num_hashes == 0 || num_bits == 0 {
        return Err(BloomError::corrupt("zero capacity/num_hashes/num_bits"));
    }
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(BloomError::corrupt(format!(
            "error_rate {} out of (0, 1)",
            error_rate
        )));
    }

    Ok(FilterParameters {
        capacity,
        error_rate,
        num_bits,
        num_hashes,
        hash_seeds: [seed1, seed2],
    })
}

/// Materialize a filter file: header + bit region, fsynced. `body` is the
/// initial bit region (must be exactly ceil(num_bits/8) bytes) or None for
/// all zeros. `perm` is applied only when the file is newly created (unix).
pub fn write_filter_file(
    path: &Path,
    p: &FilterParameters,
    body: Option<&[u8]>,
    perm: Option<u32>,
) -> Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true).truncate(true).read(true).write(true);
    #[cfg(unix)]
    {
        if let Some(mode) = perm {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(mode);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = &perm;
    }

    let mut f = opts.open(path)?;

    f.seek(SeekFrom::Start(0))?;
    f.write_all(&encode_header(p))?;

    let total = byte_len(p.num_bits);
    match body {
        Some(bits) => {
            debug_assert_eq!(bits.len(), total);
            f.write_all(bits)?;
        }
        None => {
            let chunk = [0u8; ZERO_CHUNK];
            let mut written = 0usize;
            while written < total {
                let n = (total - written).min(ZERO_CHUNK);
                f.write_all(&chunk[..n])?;
                written += n;
            }
        }
    }
    f.sync_all()?;

    debug!(
        "wrote filter file {} (num_bits={}, body={} B)",
        path.display(),
        p.num_bits,
        total
    );
    Ok(f)
}

/// Open an existing filter file, validate the header and the file length,
/// and return the handle positioned after the header.
pub fn open_filter_file(path: &Path, mode: OpenMode) -> Result<(File, FilterParameters)> {
    let mut opts = OpenOptions::new();
    opts.read(true);
    if mode == OpenMode::ReadWrite {
        opts.write(true);
    }
    let mut f = opts.open(path)?;

    let file_len = f.metadata()?.len();
    if file_len < HEADER_SIZE_U64 {
        return Err(BloomError::corrupt(format!(
            "{}: truncated file ({} bytes, header needs {})",
            path.display(),
            file_len,
            HEADER_SIZE
        )));
    }

    let mut hdr = [0u8; HEADER_SIZE];
    f.seek(SeekFrom::Start(0))?;
    f.read_exact(&mut hdr)?;
    let p = decode_header(&hdr)
        .map_err(|e| match e {
            BloomError::Io(inner) => BloomError::corrupt(format!("{}: {}", path.display(), inner)),
            other => other,
        })?;

    let expected = HEADER_SIZE_U64 + byte_len(p.num_bits) as u64;
    if file_len != expected {
        return Err(BloomError::corrupt(format!(
            "{}: bit region length mismatch (file {} bytes, expected {})",
            path.display(),
            file_len,
            expected
        )));
    }

    debug!(
        "opened filter file {} ({:?}, num_bits={})",
        path.display(),
        mode,
        p.num_bits
    );
    Ok((f, p))
}

/// Encode header + bit region as one base64 string.
pub fn encode_blob(p: &FilterParameters, bits: &[u8]) -> String {
    let mut raw = Vec::with_capacity(HEADER_SIZE + bits.len());
    raw.extend_from_slice(&encode_header(p));
    raw.extend_from_slice(bits);
    BASE64.encode(raw)
}

/// Decode a base64 blob back into parameters + bit region.
pub fn decode_blob(blob: &str) -> Result<(FilterParameters, Vec<u8>)> {
    let raw = BASE64
        .decode(blob.trim())
        .map_err(|e| BloomError::corrupt(format!("base64 decode: {}", e)))?;
    if raw.len() < HEADER_SIZE {
        return Err(BloomError::corrupt(format!(
            "blob too short: {} bytes",
            raw.len()
        )));
    }
    let p = decode_header(&raw[..HEADER_SIZE])?;
    let expected = HEADER_SIZE + byte_len(p.num_bits);
    if raw.len() != expected {
        return Err(BloomError::corrupt(format!(
            "blob bit region length mismatch ({} bytes, expected {})",
            raw.len(),
            expected
        )));
    }
    Ok((p, raw[HEADER_SIZE..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SeedSpec;

    fn params() -> FilterParameters {
        FilterParameters::derive(200, 0.001, SeedSpec::Single(42)).unwrap()
    }

    #[test]
    fn header_roundtrip_is_exact() {
        let p0 = params();
        let hdr = encode_header(&p0);
        let p1 = decode_header(&hdr).unwrap();
        assert_eq!(p1.capacity, p0.capacity);
        assert_eq!(p1.error_rate.to_bits(), p0.error_rate.to_bits());
        assert_eq!(p1.num_bits, p0.num_bits);
        assert_eq!(p1.num_hashes, p0.num_hashes);
        assert_eq!(p1.hash_seeds, p0.hash_seeds);
        assert!(p1.compatible(&p0));
    }

    #[test]
    fn decode_rejects_garbage() {
        let p = params();

        let mut bad_magic = encode_header(&p);
        bad_magic[0] ^= 0xFF;
        assert!(matches!(decode_header(&bad_magic), Err(BloomError::Io(_))));

        let mut bad_version = encode_header(&p);
        LittleEndian::write_u32(&mut bad_version[OFF_VERSION..OFF_VERSION + 4], 99);
        assert!(matches!(decode_header(&bad_version), Err(BloomError::Io(_))));

        let mut zero_bits = encode_header(&p);
        LittleEndian::write_u64(&mut zero_bits[OFF_NUM_BITS..OFF_NUM_BITS + 8], 0);
        assert!(matches!(decode_header(&zero_bits), Err(BloomError::Io(_))));

        assert!(matches!(decode_header(&[0u8; 10]), Err(BloomError::Io(_))));
    }

    #[test]
    fn blob_roundtrip() {
        let p = params();
        let mut bits = vec![0u8; p.byte_len()];
        bits[0] = 0xA5;
        bits[p.byte_len() - 1] = 0x5A;

        let blob = encode_blob(&p, &bits);
        let (p1, bits1) = decode_blob(&blob).unwrap();
        assert!(p1.compatible(&p));
        assert_eq!(bits1, bits);
    }

    #[test]
    fn blob_length_mismatch_is_corrupt() {
        let p = params();
        let bits = vec![0u8; p.byte_len() - 1]; // one byte short
        let blob = encode_blob(&p, &bits);
        assert!(matches!(decode_blob(&blob), Err(BloomError::Io(_))));

        assert!(matches!(decode_blob("not base64 !!!"), Err(BloomError::Io(_))));
    }
}
