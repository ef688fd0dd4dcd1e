//! Compressing blob storage layer.
//!
//! Deflates blobs (zlib framing) on the way in and inflates them on the way
//! out. A fresh codec context is built for every call, so the layer keeps no
//! codec state between operations.

use crate::{BlobStorage, CorruptionCause, Operation, RecordId, Result, StorageCorruption};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{trace, warn};

/// Compression level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// No compression
    None,
    /// Fast compression (lower ratio)
    Fast,
    /// Default compression (balanced)
    Default,
    /// Best compression (slower, higher ratio)
    Best,
}

impl CompressionLevel {
    /// Converts to flate2 compression level.
    pub fn to_flate2(self) -> flate2::Compression {
        match self {
            CompressionLevel::None => flate2::Compression::none(),
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
        }
    }

    /// Parses a level name as accepted on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "fast" => Some(Self::Fast),
            "default" => Some(Self::Default),
            "best" => Some(Self::Best),
            _ => None,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::Fast
    }
}

/// Compression statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CompressionStats {
    /// Total bytes before compression.
    pub input_bytes: u64,
    /// Total bytes after compression.
    pub output_bytes: u64,
    /// Number of compression operations.
    pub compress_count: u64,
    /// Number of decompression operations.
    pub decompress_count: u64,
}

impl CompressionStats {
    /// Returns the compression ratio (output/input).
    pub fn compression_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            1.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }

    /// Returns the space savings percentage.
    pub fn space_savings(&self) -> f64 {
        1.0 - self.compression_ratio()
    }

    fn record_compress(&mut self, input_size: usize, output_size: usize) {
        self.input_bytes += input_size as u64;
        self.output_bytes += output_size as u64;
        self.compress_count += 1;
    }
}

/// Blob storage layer that deflates stored content.
pub struct CompressingStorage<S> {
    inner: S,
    level: CompressionLevel,
    stats: CompressionStats,
}

impl<S: BlobStorage> CompressingStorage<S> {
    /// Wraps a storage layer using the given level.
    pub fn new(inner: S, level: CompressionLevel) -> Self {
        Self {
            inner,
            level,
            stats: CompressionStats::default(),
        }
    }

    /// Returns the underlying layer.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the configured level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Returns compression statistics.
    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    fn deflate(&self, content: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(content.len() / 2 + 16),
            self.level.to_flate2(),
        );
        encoder.write_all(content)?;
        encoder.finish()
    }
}

fn inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut content = Vec::with_capacity(compressed.len().saturating_mul(2));
    decoder.read_to_end(&mut content)?;
    Ok(content)
}

impl<S: BlobStorage> BlobStorage for CompressingStorage<S> {
    fn store(&mut self, content: &[u8]) -> Result<RecordId> {
        let compressed = self.deflate(content).map_err(|e| {
            StorageCorruption::new(Operation::Store, None, CorruptionCause::Io(e))
        })?;
        self.stats.record_compress(content.len(), compressed.len());
        trace!(
            input = content.len(),
            output = compressed.len(),
            "compressed blob"
        );
        self.inner.store(&compressed)
    }

    fn load(&mut self, id: RecordId) -> Result<Bytes> {
        let compressed = self.inner.load(id)?;
        let content = inflate(&compressed).map_err(|source| {
            warn!(id, len = compressed.len(), error = %source, "cannot inflate blob");
            StorageCorruption::new(
                Operation::Load,
                Some(id),
                CorruptionCause::Decompression {
                    len: compressed.len(),
                    source,
                },
            )
        })?;
        self.stats.decompress_count += 1;
        Ok(Bytes::from(content))
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        self.inner.remove(id)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::mock::MockStorage;

    #[test]
    fn test_compression_level_default() {
        let level = CompressionLevel::default();
        assert_eq!(level, CompressionLevel::Fast);
    }

    #[test]
    fn test_compression_level_parse() {
        assert_eq!(CompressionLevel::parse("best"), Some(CompressionLevel::Best));
        assert_eq!(CompressionLevel::parse("none"), Some(CompressionLevel::None));
        assert_eq!(CompressionLevel::parse("turbo"), None);
    }

    #[test]
    fn test_stores_compressed_bytes() {
        let mock = MockStorage::new();
        let blobs = mock.blobs();
        let mut storage = CompressingStorage::new(mock, CompressionLevel::Fast);

        let content = vec![b'a'; 4096];
        let id = storage.store(&content).unwrap();

        let stored = blobs.lock().get(&id).cloned().unwrap();
        assert!(stored.len() < content.len());
        assert_eq!(inflate(&stored).unwrap(), content);
    }

    #[test]
    fn test_roundtrip_through_inner() {
        let mut storage = CompressingStorage::new(MockStorage::new(), CompressionLevel::Best);

        for content in [&b""[..], b"x", b"hello hello hello hello"] {
            let id = storage.store(content).unwrap();
            assert_eq!(storage.load(id).unwrap().as_ref(), content);
        }
    }

    #[test]
    fn test_corrupt_stream_reports_id_and_length() {
        let mock = MockStorage::new();
        let blobs = mock.blobs();
        let mut storage = CompressingStorage::new(mock, CompressionLevel::Fast);

        let id = storage.store(b"payload").unwrap();
        blobs.lock().insert(id, b"definitely not zlib".to_vec());

        let err = storage.load(id).unwrap_err();
        assert_eq!(err.id, Some(id));
        match err.cause {
            CorruptionCause::Decompression { len, .. } => assert_eq!(len, 19),
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[test]
    fn test_inner_errors_pass_through() {
        let mut storage = CompressingStorage::new(MockStorage::new(), CompressionLevel::Fast);
        let err = storage.load(99).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_compression_stats() {
        let mut storage = CompressingStorage::new(MockStorage::new(), CompressionLevel::Fast);
        let id = storage.store(&[0u8; 1000]).unwrap();
        storage.load(id).unwrap();

        let stats = storage.stats();
        assert_eq!(stats.input_bytes, 1000);
        assert_eq!(stats.compress_count, 1);
        assert_eq!(stats.decompress_count, 1);
        assert!(stats.space_savings() > 0.5);
    }

    #[test]
    fn test_compression_ratio_zero_input() {
        let stats = CompressionStats::default();
        assert_eq!(stats.compression_ratio(), 1.0);
    }

    #[test]
    fn test_pass_through_operations() {
        let mock = MockStorage::new();
        let calls = std::sync::Arc::clone(&mock.calls);
        let mut storage = CompressingStorage::new(mock, CompressionLevel::Fast);

        storage.set_version(5).unwrap();
        assert_eq!(storage.version().unwrap(), 5);
        storage.flush().unwrap();
        storage.close().unwrap();
        assert_eq!(calls.flushes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(calls.closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
