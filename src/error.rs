//! Error surface of the engine.
//!
//! Every failure is one of five kinds so that a binding layer can translate
//! them into host-appropriate signaling without string matching:
//! - InvalidArgument — malformed construction parameters.
//! - Io — path/filesystem failures, truncated or corrupt files on open.
//! - ReadOnly — mutating call on a filter opened in read-only mode.
//! - Incompatible — set algebra between filters with differing parameters.
//! - Unsupported — file-requiring operation on an anonymous filter.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BloomError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("filter is read-only: {op} requires write access")]
    ReadOnly { op: &'static str },

    #[error("incompatible filter parameters: {0}")]
    Incompatible(String),

    #[error("unsupported operation on anonymous filter: {op}")]
    Unsupported { op: &'static str },
}

impl BloomError {
    /// Corrupt/truncated file detected while decoding. Surfaced under the
    /// Io kind (it is an input-data failure, not a usage error).
    pub(crate) fn corrupt(what: impl Into<String>) -> Self {
        BloomError::Io(io::Error::new(io::ErrorKind::InvalidData, what.into()))
    }
}

pub type Result<T> = std::result::Result<T, BloomError>;
