//! Error types for the save format.

use std::fmt;
use std::io;

use widen_arena::ArenaError;

/// Errors that can occur while writing or reading a save.
#[derive(Debug)]
pub enum SaveError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream does not start with the expected `b"WDEN"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the stream.
        found: u8,
    },
    /// A record could not be decoded (truncated or corrupt data).
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// More records were requested than the arena can hold.
    CapacityMismatch {
        /// Records requested.
        records: usize,
        /// Arena capacity.
        capacity: usize,
    },
    /// Bytes remain after the last expected record.
    TrailingData,
    /// The arena rejected a bookkeeping operation.
    Arena(ArenaError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"WDEN\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::MalformedRecord { detail } => write!(f, "malformed record: {detail}"),
            Self::CapacityMismatch { records, capacity } => {
                write!(f, "{records} records do not fit an arena of {capacity}")
            }
            Self::TrailingData => write!(f, "unread data after the last unit record"),
            Self::Arena(e) => write!(f, "arena error: {e}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SaveError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ArenaError> for SaveError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
