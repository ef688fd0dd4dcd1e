//! Change log for local history.
//!
//! This crate implements the binary codec for change records (file creation,
//! content change, rename, move, delete, labels) and the tree snapshots they
//! embed, plus a sequential, version-stamped log file holding those records.
//! Content in a change is written as a record id into a content storage and
//! resolved lazily after decoding.

pub mod change;
mod changelog;
mod codec;
pub mod entry;
mod error;
mod stream;

pub use change::Change;
pub use changelog::{ChangeLog, Changes};
pub use codec::{
    encode_change, read_change, read_entry, write_change, write_entry, ChangeKind, EntryKind,
};
pub use entry::Entry;
pub use error::{LogError, RecordKind};
pub use stream::{LogReader, LogWriter, MAX_ENTRY_DEPTH};

/// Result type for change log operations.
pub type Result<T> = std::result::Result<T, LogError>;
