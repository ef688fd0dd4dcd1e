//! Blob storage trait.
//!
//! Every layer of the content storage stack implements [`BlobStorage`] and
//! owns the layer beneath it, so layers compose as plain decorators.

use crate::{RecordId, Result};
use bytes::Bytes;

/// Trait for blob storage layers.
///
/// Methods take `&mut self`: no layer below
/// [`ThreadSafeStorage`](crate::ThreadSafeStorage) is safe to share between
/// threads on its own.
pub trait BlobStorage: Send {
    /// Stores a blob and returns the id it can be loaded by.
    fn store(&mut self, content: &[u8]) -> Result<RecordId>;

    /// Loads a previously stored blob.
    fn load(&mut self, id: RecordId) -> Result<Bytes>;

    /// Removes a blob. The id must not be loaded afterwards.
    fn remove(&mut self, id: RecordId) -> Result<()>;

    /// Forces pending writes to stable storage.
    fn flush(&mut self) -> Result<()>;

    /// Closes the storage.
    fn close(&mut self) -> Result<()>;

    /// Returns the persisted version stamp.
    fn version(&self) -> Result<i32>;

    /// Replaces the persisted version stamp.
    fn set_version(&mut self, version: i32) -> Result<()>;
}

impl<T: BlobStorage + ?Sized> BlobStorage for Box<T> {
    fn store(&mut self, content: &[u8]) -> Result<RecordId> {
        (**self).store(content)
    }

    fn load(&mut self, id: RecordId) -> Result<Bytes> {
        (**self).load(id)
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        (**self).remove(id)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn version(&self) -> Result<i32> {
        (**self).version()
    }

    fn set_version(&mut self, version: i32) -> Result<()> {
        (**self).set_version(version)
    }
}
