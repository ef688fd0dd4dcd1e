//! Raw record store interface.
//!
//! A record store is an allocator of opaque byte records addressed by an
//! integer id. The blob layers treat it as a collaborator: anything it
//! reports is surfaced as [`StorageCorruption`](crate::StorageCorruption) by
//! the record adapter.

use std::collections::HashMap;
use std::io;

/// Identifier assigned to a record by the record store.
pub type RecordId = i32;

/// Trait for raw record stores.
///
/// Ids are stable until the record is removed; a removed id must not be read
/// again. Implementations are not required to be thread-safe.
pub trait RecordStore: Send {
    /// Writes a new record and returns its id.
    fn store(&mut self, data: &[u8]) -> io::Result<RecordId>;

    /// Reads a whole record.
    ///
    /// Fails with [`io::ErrorKind::NotFound`] for unknown or removed ids.
    fn load(&mut self, id: RecordId) -> io::Result<Vec<u8>>;

    /// Deletes a record.
    fn remove(&mut self, id: RecordId) -> io::Result<()>;

    /// Forces pending writes to stable storage.
    fn force(&mut self) -> io::Result<()>;

    /// Releases the store. Later calls fail.
    fn dispose(&mut self) -> io::Result<()>;

    /// Returns the persisted version stamp.
    fn version(&self) -> io::Result<i32>;

    /// Replaces the persisted version stamp.
    fn set_version(&mut self, version: i32) -> io::Result<()>;
}

pub(crate) fn not_found(id: RecordId) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("record {id} not found"))
}

pub(crate) fn disposed() -> io::Error {
    io::Error::other("record store is disposed")
}

/// An in-memory record store for tests and scratch use.
#[derive(Debug)]
pub struct MemoryRecordStore {
    records: HashMap<RecordId, Vec<u8>>,
    next_id: RecordId,
    version: i32,
    disposed: bool,
}

impl MemoryRecordStore {
    /// Creates an empty store. The first id handed out is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            next_id: 1,
            version: 0,
            disposed: false,
        }
    }

    /// Returns the number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are live.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the raw bytes of a record without going through the trait.
    pub fn raw(&self, id: RecordId) -> Option<&[u8]> {
        self.records.get(&id).map(Vec::as_slice)
    }

    /// Overwrites a record in place. Used to simulate on-disk damage.
    pub fn corrupt(&mut self, id: RecordId, data: Vec<u8>) {
        self.records.insert(id, data);
    }

    fn check_open(&self) -> io::Result<()> {
        if self.disposed {
            Err(disposed())
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    fn store(&mut self, data: &[u8]) -> io::Result<RecordId> {
        self.check_open()?;
        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| io::Error::other("record ids exhausted"))?;
        self.records.insert(id, data.to_vec());
        Ok(id)
    }

    fn load(&mut self, id: RecordId) -> io::Result<Vec<u8>> {
        self.check_open()?;
        self.records.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    fn remove(&mut self, id: RecordId) -> io::Result<()> {
        self.check_open()?;
        self.records.remove(&id);
        Ok(())
    }

    fn force(&mut self) -> io::Result<()> {
        self.check_open()
    }

    fn dispose(&mut self) -> io::Result<()> {
        self.disposed = true;
        Ok(())
    }

    fn version(&self) -> io::Result<i32> {
        Ok(self.version)
    }

    fn set_version(&mut self, version: i32) -> io::Result<()> {
        self.check_open()?;
        self.version = version;
        Ok(())
    }
}
