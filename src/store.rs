//! Bit store: a fixed-length bit vector, anonymous or file-backed.
//!
//! File-backed stores map the bit region (everything past the header) with
//! memmap2; mutations go straight through the mapping and reach the OS page
//! cache, `flush()` is the only durability barrier. Read-only mode is
//! enforced here at the API layer: mutating calls are rejected before the
//! mapping is touched. This is deliberate — no reliance on OS memory
//! protection (a read-only fd cannot be mapped writable anyway).
//!
//! Concurrency contract: no internal locking. Two writers on the same file
//! risk lost updates; callers serialize externally.

use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::consts::HEADER_SIZE_U64;
use crate::error::{BloomError, Result};

/// Access mode of a file-backed store, fixed at open/create time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug)]
enum Backing {
    Anon(Box<[u8]>),
    FileRw {
        file: File,
        map: MmapMut,
        path: PathBuf,
    },
    FileRo {
        // fd kept open for the lifetime of the mapping
        #[allow(dead_code)]
        file: File,
        map: Mmap,
        path: PathBuf,
    },
}

/// A contiguous bit sequence of length `num_bits`.
#[derive(Debug)]
pub struct BitStore {
    backing: Backing,
    num_bits: u64,
}

impl BitStore {
    /// Zeroed in-memory store (always writable).
    pub fn anon(num_bits: u64) -> Self {
        let len = byte_len(num_bits);
        Self {
            backing: Backing::Anon(vec![0u8; len].into_boxed_slice()),
            num_bits,
        }
    }

    /// Map the bit region of an already-sized filter file, read-write.
    /// The file must span `HEADER_SIZE + ceil(num_bits/8)` bytes.
    pub fn map_rw(file: File, path: PathBuf, num_bits: u64) -> Result<Self> {
        let len = byte_len(num_bits);
        let map = unsafe {
            MmapOptions::new()
                .offset(HEADER_SIZE_U64)
                .len(len)
                .map_mut(&file)?
        };
        Ok(Self {
            backing: Backing::FileRw { file, map, path },
            num_bits,
        })
    }

    /// Map the bit region read-only.
    pub fn map_ro(file: File, path: PathBuf, num_bits: u64) -> Result<Self> {
        let len = byte_len(num_bits);
        let map = unsafe {
            MmapOptions::new()
                .offset(HEADER_SIZE_U64)
                .len(len)
                .map(&file)?
        };
        Ok(Self {
            backing: Backing::FileRo { file, map, path },
            num_bits,
        })
    }

    #[inline]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn mode(&self) -> OpenMode {
        match self.backing {
            Backing::Anon(_) | Backing::FileRw { .. } => OpenMode::ReadWrite,
            Backing::FileRo { .. } => OpenMode::ReadOnly,
        }
    }

    pub fn is_file_backed(&self) -> bool {
        !matches!(self.backing, Backing::Anon(_))
    }

    /// Backing file path, None for anonymous stores.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Anon(_) => None,
            Backing::FileRw { path, .. } => Some(path),
            Backing::FileRo { path, .. } => Some(path),
        }
    }

    #[inline]
    pub fn get(&self, bit: u64) -> bool {
        debug_assert!(bit < self.num_bits, "bit {} out of range", bit);
        let bytes = self.bytes();
        let byte = (bit / 8) as usize;
        let mask = 1u8 << (bit % 8);
        (bytes[byte] & mask) != 0
    }

    /// Set a single bit (OR semantics, idempotent).
    #[inline]
    pub fn set(&mut self, bit: u64) -> Result<()> {
        debug_assert!(bit < self.num_bits, "bit {} out of range", bit);
        let bytes = self.bytes_mut("set bit")?;
        let byte = (bit / 8) as usize;
        let mask = 1u8 << (bit % 8);
        bytes[byte] |= mask;
        Ok(())
    }

    /// Zero every bit.
    pub fn clear_all(&mut self) -> Result<()> {
        self.bytes_mut("clear_all")?.fill(0);
        Ok(())
    }

    /// The full bit region. Reads always succeed regardless of mode.
    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Anon(b) => b,
            Backing::FileRw { map, .. } => &map[..],
            Backing::FileRo { map, .. } => &map[..],
        }
    }

    /// Mutable view of the bit region; fails on a read-only store before
    /// touching the mapping.
    pub fn bytes_mut(&mut self, op: &'static str) -> Result<&mut [u8]> {
        match &mut self.backing {
            Backing::Anon(b) => Ok(b),
            Backing::FileRw { map, .. } => Ok(&mut map[..]),
            Backing::FileRo { .. } => Err(BloomError::ReadOnly { op }),
        }
    }

    /// Durability barrier: flush dirty pages and fsync the file. No-op for
    /// anonymous and read-only stores (nothing can be dirty).
    pub fn flush(&self) -> Result<()> {
        if let Backing::FileRw { file, map, .. } = &self.backing {
            map.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn byte_len(num_bits: u64) -> usize {
    ((num_bits + 7) / 8) as usize
}
