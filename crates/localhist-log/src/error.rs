//! Change log error types.

use localhist_storage::StorageCorruption;
use std::fmt;
use thiserror::Error;

/// Which tag table a record type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Change records (tags 1 to 9).
    Change,
    /// Tree entry records (tags 0 and 1).
    Entry,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Change => f.write_str("change"),
            Self::Entry => f.write_str("entry"),
        }
    }
}

/// Errors that can occur while encoding or decoding the change log.
#[derive(Debug, Error)]
pub enum LogError {
    /// A tag outside the fixed table was read.
    #[error("unknown {kind} record type: {tag}")]
    UnknownRecordType {
        /// Table the tag was looked up in.
        kind: RecordKind,
        /// Offending tag value.
        tag: i32,
    },

    /// A string field is not valid UTF-8.
    #[error("invalid string: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// A value does not fit the wire format.
    #[error("value too large: {0}")]
    TooLarge(String),

    /// The log file does not start with a valid header.
    #[error("invalid change log header")]
    InvalidHeader,

    /// A log frame failed its length or checksum check.
    #[error("damaged change log record at offset {offset}")]
    TornRecord {
        /// File offset of the damaged frame.
        offset: u64,
    },

    /// Storage error while resolving content.
    #[error("storage error: {0}")]
    Storage(#[from] StorageCorruption),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Returns true for an unknown record tag.
    pub fn is_unknown_record_type(&self) -> bool {
        matches!(self, Self::UnknownRecordType { .. })
    }
}
