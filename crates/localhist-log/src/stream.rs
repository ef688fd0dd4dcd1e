//! Primitive readers and writers for the change log wire format.
//!
//! All integers are big-endian. Strings are a `u32` byte length followed by
//! UTF-8. Optional strings carry a one-byte presence flag first. Content is a
//! one-byte availability flag followed, for stored content, by its record id.

use crate::{LogError, Result};
use localhist_storage::{Content, StoredContent, ThreadSafeStorage};
use std::io::{Read, Write};
use std::sync::{Arc, Weak};

/// Deepest directory nesting accepted when decoding tree entries.
pub const MAX_ENTRY_DEPTH: usize = 256;

/// Writer for change log primitives.
pub struct LogWriter<W> {
    writer: W,
}

impl<W: Write> LogWriter<W> {
    /// Creates a new writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a 4-byte integer.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes an unsigned 4-byte integer.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes an 8-byte integer.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.writer.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a one-byte boolean.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.writer.write_all(&[u8::from(value)])?;
        Ok(())
    }

    /// Writes a length-prefixed string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len())
            .map_err(|_| LogError::TooLarge(format!("string of {} bytes", value.len())))?;
        self.write_u32(len)?;
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Writes a presence flag, then the string if present.
    pub fn write_string_or_null(&mut self, value: Option<&str>) -> Result<()> {
        self.write_bool(value.is_some())?;
        if let Some(value) = value {
            self.write_string(value)?;
        }
        Ok(())
    }

    /// Writes a content reference.
    pub fn write_content(&mut self, content: &Content) -> Result<()> {
        match content {
            Content::Stored(stored) => {
                self.write_bool(true)?;
                self.write_i32(stored.id())
            }
            Content::Unavailable => self.write_bool(false),
        }
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reader for change log primitives.
///
/// Content references are bound to the storage given at construction.
pub struct LogReader<R> {
    reader: R,
    storage: Weak<ThreadSafeStorage>,
    depth: usize,
}

impl<R: Read> LogReader<R> {
    /// Creates a new reader resolving content against `storage`.
    pub fn new(reader: R, storage: &Arc<ThreadSafeStorage>) -> Self {
        Self {
            reader,
            storage: Arc::downgrade(storage),
            depth: 0,
        }
    }

    /// Runs `f` one directory level deeper.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_ENTRY_DEPTH {
            return Err(LogError::TooLarge(format!(
                "directory nesting deeper than {MAX_ENTRY_DEPTH}"
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a 4-byte integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads an unsigned 4-byte integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads an 8-byte integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads a one-byte boolean. Any non-zero byte is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        let [b] = self.read_array::<1>()?;
        Ok(b != 0)
    }

    /// Reads a length-prefixed string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        let mut bytes = Vec::new();
        (&mut self.reader).take(u64::from(len)).read_to_end(&mut bytes)?;
        if bytes.len() != len as usize {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("string truncated after {} of {len} bytes", bytes.len()),
            )
            .into());
        }
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads a presence flag, then the string if present.
    pub fn read_string_or_null(&mut self) -> Result<Option<String>> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }

    /// Reads a content reference.
    pub fn read_content(&mut self) -> Result<Content> {
        if !self.read_bool()? {
            return Ok(Content::Unavailable);
        }
        let id = self.read_i32()?;
        match self.storage.upgrade() {
            Some(storage) => Ok(Content::Stored(StoredContent::new(&storage, id))),
            // Nothing can resolve the id any more.
            None => Ok(Content::Unavailable),
        }
    }

    /// Returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use localhist_storage::{CachingStorage, MemoryRecordStore, RecordBlobStorage, ThreadSafeStorage};
    use std::sync::Arc;

    /// An in-memory storage stack for codec tests.
    pub fn storage() -> Arc<ThreadSafeStorage> {
        Arc::new(ThreadSafeStorage::new(CachingStorage::with_defaults(
            RecordBlobStorage::new(MemoryRecordStore::new()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::storage;
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn reader(bytes: Vec<u8>, storage: &Arc<ThreadSafeStorage>) -> LogReader<Cursor<Vec<u8>>> {
        LogReader::new(Cursor::new(bytes), storage)
    }

    #[test]
    fn test_integers_are_big_endian() {
        let mut writer = LogWriter::new(Vec::new());
        writer.write_i32(1).unwrap();
        writer.write_i64(-2).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..], &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn test_string_or_null() {
        let storage = storage();
        let mut writer = LogWriter::new(Vec::new());
        writer.write_string_or_null(None).unwrap();
        writer.write_string_or_null(Some("x")).unwrap();
        writer.write_string_or_null(Some("")).unwrap();

        let mut reader = reader(writer.into_inner(), &storage);
        assert_eq!(reader.read_string_or_null().unwrap(), None);
        assert_eq!(reader.read_string_or_null().unwrap(), Some("x".to_string()));
        assert_eq!(reader.read_string_or_null().unwrap(), Some(String::new()));
    }

    #[test]
    fn test_null_is_one_byte() {
        let mut writer = LogWriter::new(Vec::new());
        writer.write_string_or_null(None).unwrap();
        assert_eq!(writer.into_inner(), vec![0]);
    }

    #[test]
    fn test_truncated_string_fails() {
        let storage = storage();
        let mut bytes = 10u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"abc");

        let err = reader(bytes, &storage).read_string().unwrap_err();
        assert!(matches!(err, LogError::Io(_)));
    }

    #[test]
    fn test_huge_string_length_does_not_allocate() {
        let storage = storage();
        let bytes = u32::MAX.to_be_bytes().to_vec();
        assert!(reader(bytes, &storage).read_string().is_err());
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let storage = storage();
        let mut bytes = 2u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);

        let err = reader(bytes, &storage).read_string().unwrap_err();
        assert!(matches!(err, LogError::InvalidString(_)));
    }

    #[test]
    fn test_content_roundtrip() {
        let storage = storage();
        let stored = storage.store_content(b"revision").unwrap();

        let mut writer = LogWriter::new(Vec::new());
        writer.write_content(&stored).unwrap();
        writer.write_content(&Content::Unavailable).unwrap();

        let mut reader = reader(writer.into_inner(), &storage);
        let read = reader.read_content().unwrap();
        assert_eq!(read, stored);
        assert_eq!(read.bytes().unwrap().as_ref(), b"revision");
        assert_eq!(reader.read_content().unwrap(), Content::Unavailable);
    }

    proptest! {
        /// Property: optional strings survive a roundtrip, including "" vs None.
        #[test]
        fn prop_string_or_null_roundtrip(value in proptest::option::of(".*")) {
            let storage = storage();
            let mut writer = LogWriter::new(Vec::new());
            writer.write_string_or_null(value.as_deref()).unwrap();

            let mut reader = reader(writer.into_inner(), &storage);
            prop_assert_eq!(reader.read_string_or_null().unwrap(), value);
        }
    }
}
