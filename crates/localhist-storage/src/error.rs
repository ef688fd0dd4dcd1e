//! Storage error types.

use crate::RecordId;
use std::fmt;
use thiserror::Error;

/// The storage operation that was in progress when a failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Opening the underlying record store.
    Open,
    /// Storing a blob.
    Store,
    /// Loading a blob.
    Load,
    /// Removing a blob.
    Remove,
    /// Forcing pending writes to stable storage.
    Flush,
    /// Closing the storage.
    Close,
    /// Reading or writing the version stamp.
    Version,
}

impl Operation {
    /// Returns the lowercase name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Store => "store",
            Self::Load => "load",
            Self::Remove => "remove",
            Self::Flush => "flush",
            Self::Close => "close",
            Self::Version => "version",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong underneath a [`StorageCorruption`].
#[derive(Debug, Error)]
pub enum CorruptionCause {
    /// The record store reported an I/O failure.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The record does not exist (never stored or already removed).
    #[error("record not found")]
    Missing,

    /// The record's length prefix does not match its body.
    #[error("invalid record framing: {0}")]
    Framing(String),

    /// The stored bytes are not a valid deflate stream.
    #[error("cannot inflate {len} stored bytes: {source}")]
    Decompression {
        /// Length of the compressed bytes handed to the decoder.
        len: usize,
        /// Decoder failure.
        #[source]
        source: std::io::Error,
    },

    /// The storage stack was closed or dropped.
    #[error("storage is closed")]
    Closed,

    /// The content was already known to be lost.
    #[error("content is unavailable")]
    Unavailable,
}

/// The single error kind raised by the blob storage stack.
///
/// Carries the operation and, where known, the record id so that callers can
/// report precisely which piece of history is damaged.
#[derive(Debug, Error)]
#[error("storage corruption during {operation}{}: {cause}", describe_record(.id))]
pub struct StorageCorruption {
    /// Operation in progress.
    pub operation: Operation,
    /// Record the operation addressed, if any.
    pub id: Option<RecordId>,
    /// Underlying cause.
    #[source]
    pub cause: CorruptionCause,
}

fn describe_record(id: &Option<RecordId>) -> String {
    match id {
        Some(id) => format!(" of record {id}"),
        None => String::new(),
    }
}

impl StorageCorruption {
    /// Creates a corruption error.
    pub fn new(operation: Operation, id: Option<RecordId>, cause: CorruptionCause) -> Self {
        Self {
            operation,
            id,
            cause,
        }
    }

    /// Wraps a record store I/O failure.
    ///
    /// `NotFound` becomes [`CorruptionCause::Missing`], everything else is kept
    /// as the I/O source.
    pub fn io(operation: Operation, id: Option<RecordId>, err: std::io::Error) -> Self {
        let cause = if err.kind() == std::io::ErrorKind::NotFound {
            CorruptionCause::Missing
        } else {
            CorruptionCause::Io(err)
        };
        Self::new(operation, id, cause)
    }

    /// Returns true if the record was simply absent.
    pub fn is_missing(&self) -> bool {
        matches!(self.cause, CorruptionCause::Missing)
    }
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageCorruption>;
