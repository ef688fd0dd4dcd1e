//! Fuzz target for change log recovery.
//!
//! Writes arbitrary bytes as a change log file and checks that opening
//! and walking it never panics, and that a reopened log is stable.

#![no_main]

use libfuzzer_sys::fuzz_target;
use localhist_log::ChangeLog;
use localhist_storage::{CachingStorage, MemoryRecordStore, RecordBlobStorage, ThreadSafeStorage};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let storage = Arc::new(ThreadSafeStorage::new(CachingStorage::with_defaults(
        RecordBlobStorage::new(MemoryRecordStore::new()),
    )));
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("changes.log");
    std::fs::write(&path, data).expect("write log");

    let Ok(mut log) = ChangeLog::open(&path, &storage) else {
        return;
    };
    let len = log.len();
    let forward = log.forward().count();
    let backward = log.backward().count();
    assert!(forward <= len && backward <= len);
    drop(log);

    // Recovery already cut the damaged tail; a second open keeps everything.
    let log = ChangeLog::open(&path, &storage).expect("reopen recovered log");
    assert_eq!(log.len(), len);
});
