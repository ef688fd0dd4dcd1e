//! Historical content handles.
//!
//! A [`Content`] is what change records hold instead of raw bytes: either a
//! reference to a stored blob, resolved lazily, or a marker for a blob that
//! is known to be lost.

use crate::{CorruptionCause, Operation, RecordId, Result, StorageCorruption, ThreadSafeStorage};
use bytes::Bytes;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A handle to one historical version of file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Content stored in a blob storage under an id.
    Stored(StoredContent),
    /// Content that is known to be permanently inaccessible.
    Unavailable,
}

impl Content {
    /// Creates a handle to an already stored blob.
    pub fn stored(storage: &Arc<ThreadSafeStorage>, id: RecordId) -> Self {
        Self::Stored(StoredContent::new(storage, id))
    }

    /// Loads the bytes.
    ///
    /// Fails on storage corruption, and always fails for
    /// [`Content::Unavailable`] without touching any storage.
    pub fn bytes(&self) -> Result<Bytes> {
        match self {
            Self::Stored(stored) => stored.bytes(),
            Self::Unavailable => Err(StorageCorruption::new(
                Operation::Load,
                None,
                CorruptionCause::Unavailable,
            )),
        }
    }

    /// Returns true if the bytes can currently be loaded.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Stored(stored) => stored.is_available(),
            Self::Unavailable => false,
        }
    }

    /// Removes the referenced blob from its storage.
    pub fn purge(&self) -> Result<()> {
        match self {
            Self::Stored(stored) => stored.purge(),
            Self::Unavailable => Ok(()),
        }
    }

    /// Returns the record id for stored content.
    pub fn id(&self) -> Option<RecordId> {
        match self {
            Self::Stored(stored) => Some(stored.id()),
            Self::Unavailable => None,
        }
    }
}

/// A blob reference: storage backreference plus record id.
///
/// The storage is held weakly; the handle does not keep the stack alive.
#[derive(Debug, Clone)]
pub struct StoredContent {
    storage: Weak<ThreadSafeStorage>,
    id: RecordId,
}

impl StoredContent {
    /// Creates a reference to a blob in `storage`.
    pub fn new(storage: &Arc<ThreadSafeStorage>, id: RecordId) -> Self {
        Self {
            storage: Arc::downgrade(storage),
            id,
        }
    }

    /// Returns the record id.
    pub fn id(&self) -> RecordId {
        self.id
    }

    fn storage(&self, operation: Operation) -> Result<Arc<ThreadSafeStorage>> {
        self.storage.upgrade().ok_or_else(|| {
            StorageCorruption::new(operation, Some(self.id), CorruptionCause::Closed)
        })
    }

    /// Loads the bytes through the storage stack.
    pub fn bytes(&self) -> Result<Bytes> {
        self.storage(Operation::Load)?.load(self.id)
    }

    /// Returns true if the blob loads without error.
    pub fn is_available(&self) -> bool {
        match self.bytes() {
            Ok(_) => true,
            Err(e) => {
                debug!(id = self.id, error = %e, "content is not available");
                false
            }
        }
    }

    /// Removes the blob from its storage.
    pub fn purge(&self) -> Result<()> {
        self.storage(Operation::Remove)?.remove(self.id)
    }
}

impl PartialEq for StoredContent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.storage, &other.storage)
    }
}

impl Eq for StoredContent {}
