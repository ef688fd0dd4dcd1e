//! LRU cache layer for blob storage.
//!
//! Keeps recently stored and loaded blobs in memory, keyed by record id.
//! Blobs above the configured size guard are never cached so that one huge
//! revision cannot flush every other entry out.

use crate::{BlobStorage, RecordId, Result};
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::trace;

/// Default number of cached blobs.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Default size guard: larger blobs bypass the cache.
pub const DEFAULT_MAX_CACHED_BLOB: usize = 100 * 1024;

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
    /// Current number of cached blobs.
    pub size: usize,
    /// Current memory usage in bytes.
    pub memory_bytes: usize,
}

impl CacheStats {
    /// Returns the cache hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cached blob storage wrapper.
///
/// The size guard applies to the bytes this layer sees. In the assembled
/// stack the cache sits below compression, so the guard measures compressed
/// blobs and a large but compressible revision is still cached.
pub struct CachingStorage<S> {
    /// The underlying storage layer.
    inner: S,
    /// LRU cache for blobs.
    cache: LruCache<RecordId, Bytes>,
    /// Blobs longer than this are not cached.
    max_blob_bytes: usize,
    stats: CacheStats,
}

impl<S: BlobStorage> CachingStorage<S> {
    /// Creates a cache holding at most `capacity` blobs of at most
    /// `max_blob_bytes` each.
    pub fn new(inner: S, capacity: usize, max_blob_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: LruCache::new(capacity),
            max_blob_bytes,
            stats: CacheStats::default(),
        }
    }

    /// Creates a cache with the default capacity and size guard.
    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_CACHED_BLOB)
    }

    /// Returns the underlying layer.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns true if the blob is currently cached.
    pub fn is_cached(&self, id: RecordId) -> bool {
        self.cache.contains(&id)
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.cache.len();
        stats
    }

    /// Drops every cached blob.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.stats.memory_bytes = 0;
    }

    /// Drops a single cached blob.
    pub fn invalidate(&mut self, id: RecordId) {
        if let Some(evicted) = self.cache.pop(&id) {
            self.stats.memory_bytes -= evicted.len();
        }
    }

    fn cache_put(&mut self, id: RecordId, content: Bytes) {
        if content.len() > self.max_blob_bytes {
            trace!(id, len = content.len(), "blob too large to cache");
            return;
        }
        self.stats.memory_bytes += content.len();
        if let Some((old_id, old)) = self.cache.push(id, content) {
            self.stats.memory_bytes -= old.len();
            if old_id != id {
                self.stats.evictions += 1;
                trace!(id = old_id, "evicted cached blob");
            }
        }
    }
}

impl<S: BlobStorage> BlobStorage for CachingStorage<S> {
    fn store(&mut self, content: &[u8]) -> Result<RecordId> {
        let id = self.inner.store(content)?;
        if content.len() <= self.max_blob_bytes {
            self.cache_put(id, Bytes::copy_from_slice(content));
        }
        Ok(id)
    }

    fn load(&mut self, id: RecordId) -> Result<Bytes> {
        if let Some(content) = self.cache.get(&id) {
            self.stats.hits += 1;
            trace!(id, "cache hit");
            return Ok(content.clone());
        }

        self.stats.misses += 1;
        let content = self.inner.load(id)?;
        self.cache_put(id, content.clone());
        Ok(content)
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        let result = self.inner.remove(id);
        self.invalidate(id);
        result
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn version(&self) -> Result<i32> {
        self.inner.version()
    }

    fn set_version(&mut self, version: i32) -> Result<()> {
        self.inner.set_version(version)
    }
}
