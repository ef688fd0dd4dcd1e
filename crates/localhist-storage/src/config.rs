//! Storage configuration and stack assembly.

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_CACHED_BLOB};
use crate::{
    CachingStorage, CompressingStorage, CompressionLevel, FileRecordStore, Operation,
    RecordBlobStorage, Result, StorageCorruption, ThreadSafeStorage,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Configuration for an assembled content storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum number of cached blobs.
    pub cache_capacity: usize,
    /// Blobs longer than this are never cached.
    pub cache_max_blob_bytes: usize,
    /// Deflate level used for stored blobs.
    pub compression: CompressionLevel,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_max_blob_bytes: DEFAULT_MAX_CACHED_BLOB,
            compression: CompressionLevel::Fast,
        }
    }
}

/// Opens the content storage in `dir` with the default configuration.
pub fn create_content_storage<P: AsRef<Path>>(dir: P) -> Result<Arc<ThreadSafeStorage>> {
    create_content_storage_with(dir, &StorageConfig::default())
}

/// Opens the content storage in `dir`.
///
/// The stack is always assembled in the same order, innermost first:
/// record adapter, cache, compression, lock.
pub fn create_content_storage_with<P: AsRef<Path>>(
    dir: P,
    config: &StorageConfig,
) -> Result<Arc<ThreadSafeStorage>> {
    let dir = dir.as_ref();
    let records = FileRecordStore::open(dir)
        .map_err(|e| StorageCorruption::io(Operation::Open, None, e))?;

    let storage = RecordBlobStorage::new(records);
    let storage = CachingStorage::new(
        storage,
        config.cache_capacity,
        config.cache_max_blob_bytes,
    );
    let storage = CompressingStorage::new(storage, config.compression);
    let storage = ThreadSafeStorage::new(storage);

    info!(path = %dir.display(), ?config, "opened content storage");
    Ok(Arc::new(storage))
}
