//! Fuzz target for change record decoding.
//!
//! Tests that the change decoder rejects arbitrary input without panicking,
//! and that anything it accepts encodes back to the bytes it consumed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use localhist_log::{encode_change, read_change, read_entry, LogReader};
use localhist_storage::{CachingStorage, MemoryRecordStore, RecordBlobStorage, ThreadSafeStorage};
use std::io::Cursor;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let storage = Arc::new(ThreadSafeStorage::new(CachingStorage::with_defaults(
        RecordBlobStorage::new(MemoryRecordStore::new()),
    )));

    let mut reader = LogReader::new(Cursor::new(data), &storage);
    if let Ok(change) = read_change(&mut reader) {
        let consumed = reader.into_inner().position() as usize;
        let encoded = encode_change(&change).expect("decoded change must encode");
        // Booleans decode any non-zero byte as true, so only compare lengths.
        assert_eq!(encoded.len(), consumed);
    }

    let _ = read_entry(&mut LogReader::new(Cursor::new(data), &storage));
});
