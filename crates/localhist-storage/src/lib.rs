//! Content storage for local history.
//!
//! Every historical revision of a file is kept as a blob in a record store.
//! Blobs pass through a fixed stack of layers: a record adapter that frames
//! each blob, an LRU cache, a deflate layer and a single lock that makes the
//! stack shareable between threads. [`Content`] handles refer to stored blobs
//! by id and resolve them lazily.

mod cache;
mod compression;
mod config;
mod content;
mod error;
pub mod file;
mod record;
mod store;
mod thread_safe;
mod traits;

pub use cache::{CacheStats, CachingStorage, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_CACHED_BLOB};
pub use compression::{CompressingStorage, CompressionLevel, CompressionStats};
pub use config::{create_content_storage, create_content_storage_with, StorageConfig};
pub use content::{Content, StoredContent};
pub use error::{CorruptionCause, Operation, Result, StorageCorruption};
pub use file::FileRecordStore;
pub use record::{MemoryRecordStore, RecordId, RecordStore};
pub use store::RecordBlobStorage;
pub use thread_safe::ThreadSafeStorage;
pub use traits::BlobStorage;
