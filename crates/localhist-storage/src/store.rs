//! Record-backed blob storage.
//!
//! The innermost blob layer. Each blob becomes exactly one record framed as
//! a big-endian `u32` length followed by the blob bytes.

use crate::{
    BlobStorage, CorruptionCause, Operation, RecordId, RecordStore, Result, StorageCorruption,
};
use bytes::Bytes;
use tracing::{trace, warn};

const LENGTH_PREFIX: usize = 4;

/// Blob storage over a raw [`RecordStore`].
pub struct RecordBlobStorage<R> {
    records: R,
}

impl<R: RecordStore> RecordBlobStorage<R> {
    /// Wraps a record store.
    pub fn new(records: R) -> Self {
        Self { records }
    }

    /// Returns the underlying record store.
    pub fn records(&self) -> &R {
        &self.records
    }

    /// Returns the underlying record store mutably.
    pub fn records_mut(&mut self) -> &mut R {
        &mut self.records
    }
}

/// Prepends the length prefix to a blob.
pub(crate) fn frame(content: &[u8]) -> Option<Vec<u8>> {
    let len = u32::try_from(content.len()).ok()?;
    let mut record = Vec::with_capacity(LENGTH_PREFIX + content.len());
    record.extend_from_slice(&len.to_be_bytes());
    record.extend_from_slice(content);
    Some(record)
}

/// Strips and checks the length prefix of a record.
pub(crate) fn unframe(record: Vec<u8>) -> std::result::Result<Bytes, String> {
    if record.len() < LENGTH_PREFIX {
        return Err(format!(
            "record of {} bytes is shorter than its length prefix",
            record.len()
        ));
    }
    let len = u32::from_be_bytes([record[0], record[1], record[2], record[3]]) as usize;
    let available = record.len() - LENGTH_PREFIX;
    if len != available {
        return Err(format!(
            "length prefix claims {len} bytes but {available} follow"
        ));
    }
    Ok(Bytes::from(record).slice(LENGTH_PREFIX..))
}

impl<R: RecordStore> BlobStorage for RecordBlobStorage<R> {
    fn store(&mut self, content: &[u8]) -> Result<RecordId> {
        let record = frame(content).ok_or_else(|| {
            StorageCorruption::new(
                Operation::Store,
                None,
                CorruptionCause::Framing(format!("blob of {} bytes is too large", content.len())),
            )
        })?;
        let id = self
            .records
            .store(&record)
            .map_err(|e| StorageCorruption::io(Operation::Store, None, e))?;
        trace!(id, len = content.len(), "stored record");
        Ok(id)
    }

    fn load(&mut self, id: RecordId) -> Result<Bytes> {
        let record = self
            .records
            .load(id)
            .map_err(|e| StorageCorruption::io(Operation::Load, Some(id), e))?;
        let content = unframe(record).map_err(|reason| {
            warn!(id, %reason, "malformed record");
            StorageCorruption::new(Operation::Load, Some(id), CorruptionCause::Framing(reason))
        })?;
        trace!(id, len = content.len(), "loaded record");
        Ok(content)
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        self.records
            .remove(id)
            .map_err(|e| StorageCorruption::io(Operation::Remove, Some(id), e))
    }

    fn flush(&mut self) -> Result<()> {
        self.records
            .force()
            .map_err(|e| StorageCorruption::io(Operation::Flush, None, e))
    }

    fn close(&mut self) -> Result<()> {
        self.records
            .dispose()
            .map_err(|e| StorageCorruption::io(Operation::Close, None, e))
    }

    fn version(&self) -> Result<i32> {
        self.records
            .version()
            .map_err(|e| StorageCorruption::io(Operation::Version, None, e))
    }

    fn set_version(&mut self, version: i32) -> Result<()> {
        self.records
            .set_version(version)
            .map_err(|e| StorageCorruption::io(Operation::Version, None, e))
    }
}
