//! Thread-safe blob storage.
//!
//! The outermost layer of every assembled stack. A single mutex is held for
//! the whole of each operation, so calls into the inner layers are fully
//! serialized: reads and writes exclude each other.

use crate::{BlobStorage, Content, RecordId, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// Blob storage that may be shared between threads.
pub struct ThreadSafeStorage {
    inner: Mutex<Box<dyn BlobStorage>>,
}

impl ThreadSafeStorage {
    /// Wraps a storage stack.
    pub fn new<S: BlobStorage + 'static>(inner: S) -> Self {
        Self {
            inner: Mutex::new(Box::new(inner)),
        }
    }

    /// Stores a blob and returns its id.
    pub fn store(&self, content: &[u8]) -> Result<RecordId> {
        self.inner.lock().store(content)
    }

    /// Loads a blob.
    pub fn load(&self, id: RecordId) -> Result<Bytes> {
        self.inner.lock().load(id)
    }

    /// Removes a blob.
    pub fn remove(&self, id: RecordId) -> Result<()> {
        self.inner.lock().remove(id)
    }

    /// Forces pending writes to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// Closes the whole stack.
    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }

    /// Returns the persisted version stamp.
    pub fn version(&self) -> Result<i32> {
        self.inner.lock().version()
    }

    /// Replaces the persisted version stamp.
    pub fn set_version(&self, version: i32) -> Result<()> {
        self.inner.lock().set_version(version)
    }

    /// Stores a blob and returns a [`Content`] handle referring to it.
    pub fn store_content(self: &Arc<Self>, content: &[u8]) -> Result<Content> {
        let id = self.store(content)?;
        Ok(Content::stored(self, id))
    }
}

impl BlobStorage for ThreadSafeStorage {
    fn store(&mut self, content: &[u8]) -> Result<RecordId> {
        self.inner.get_mut().store(content)
    }

    fn load(&mut self, id: RecordId) -> Result<Bytes> {
        self.inner.get_mut().load(id)
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        self.inner.get_mut().remove(id)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.get_mut().flush()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.get_mut().close()
    }

    fn version(&self) -> Result<i32> {
        self.inner.lock().version()
    }

    fn set_version(&mut self, version: i32) -> Result<()> {
        self.inner.get_mut().set_version(version)
    }
}
