//! File-backed record store.
//!
//! All records live in one append-only data file:
//!
//! ```text
//! [4 bytes: magic "LHRS"][4 bytes: version (big-endian i32)]
//! frame*
//!
//! frame:
//! [1 byte: kind (1 = put, 2 = remove)]
//! [4 bytes: record id (big-endian i32)]
//! [4 bytes: payload length (big-endian u32)]
//! [4 bytes: CRC32 over kind, id, length and payload]
//! [N bytes: payload]
//! ```
//!
//! Opening the store replays every frame to rebuild the id index. A damaged
//! frame that is the last thing in the file came from an interrupted append
//! and is cut off. A damaged frame with more data behind it fails the open
//! and the file is left untouched.

use crate::record::{disposed, not_found, RecordId, RecordStore};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the data file inside the store directory.
pub const DATA_FILE: &str = "records.dat";

const MAGIC: &[u8; 4] = b"LHRS";
const HEADER_SIZE: u64 = 8;
const FRAME_HEADER_SIZE: usize = 13;
const KIND_PUT: u8 = 1;
const KIND_REMOVE: u8 = 2;

/// Location of a live record's payload in the data file.
#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u64,
    len: u32,
}

/// Record store persisted in a single append-only file.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    file: Option<File>,
    index: HashMap<RecordId, Slot>,
    next_id: RecordId,
    end: u64,
    version: i32,
}

impl FileRecordStore {
    /// Opens or creates a store in the given directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(DATA_FILE);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE {
            // A crash before the header reached disk leaves nothing worth keeping.
            debug!(path = %path.display(), "initializing record store");
            file.set_len(0)?;
            write_header(&mut file, 0)?;
            file.sync_data()?;
        }

        let version = read_header(&mut file)?;
        let replay = replay(&mut file)?;
        let file_len = file.metadata()?.len();
        if replay.end < file_len {
            warn!(
                path = %path.display(),
                valid = replay.end,
                dropped = file_len - replay.end,
                "truncating damaged tail of record store"
            );
            file.set_len(replay.end)?;
            file.sync_data()?;
        }

        debug!(
            path = %path.display(),
            records = replay.index.len(),
            version,
            "opened record store"
        );

        Ok(Self {
            path,
            file: Some(file),
            index: replay.index,
            next_id: replay.next_id,
            end: replay.end,
            version,
        })
    }

    /// Returns the path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of live records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no records are live.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(disposed)
    }

    fn append_frame(&mut self, kind: u8, id: RecordId, payload: &[u8]) -> io::Result<u64> {
        let len = u32::try_from(payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record too large"))?;
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.push(kind);
        frame.extend_from_slice(&id.to_be_bytes());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&frame_crc(kind, id, len, payload).to_be_bytes());
        frame.extend_from_slice(payload);

        let start = self.end;
        let file = self.file()?;
        file.seek(SeekFrom::Start(start))?;
        file.write_all(&frame)?;
        self.end = start + frame.len() as u64;
        Ok(start + FRAME_HEADER_SIZE as u64)
    }
}

impl RecordStore for FileRecordStore {
    fn store(&mut self, data: &[u8]) -> io::Result<RecordId> {
        let id = self.next_id;
        let offset = self.append_frame(KIND_PUT, id, data)?;
        self.index.insert(
            id,
            Slot {
                offset,
                len: data.len() as u32,
            },
        );
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| io::Error::other("record ids exhausted"))?;
        Ok(id)
    }

    fn load(&mut self, id: RecordId) -> io::Result<Vec<u8>> {
        let slot = *self.index.get(&id).ok_or_else(|| not_found(id))?;
        let file = self.file()?;
        file.seek(SeekFrom::Start(slot.offset))?;
        let mut data = vec![0u8; slot.len as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    }

    fn remove(&mut self, id: RecordId) -> io::Result<()> {
        if self.index.contains_key(&id) {
            self.append_frame(KIND_REMOVE, id, &[])?;
            self.index.remove(&id);
        }
        Ok(())
    }

    fn force(&mut self) -> io::Result<()> {
        self.file()?.sync_data()
    }

    fn dispose(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            debug!(path = %self.path.display(), "closed record store");
        }
        Ok(())
    }

    fn version(&self) -> io::Result<i32> {
        Ok(self.version)
    }

    fn set_version(&mut self, version: i32) -> io::Result<()> {
        write_header(self.file()?, version)?;
        self.version = version;
        Ok(())
    }
}

fn write_header(file: &mut File, version: i32) -> io::Result<()> {
    let mut header = [0u8; HEADER_SIZE as usize];
    header[..4].copy_from_slice(MAGIC);
    header[4..].copy_from_slice(&version.to_be_bytes());
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header)
}

fn read_header(file: &mut File) -> io::Result<i32> {
    let mut header = [0u8; HEADER_SIZE as usize];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut header)?;
    if &header[..4] != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a record store file",
        ));
    }
    Ok(i32::from_be_bytes([header[4], header[5], header[6], header[7]]))
}

fn frame_crc(kind: u8, id: RecordId, len: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[kind]);
    hasher.update(&id.to_be_bytes());
    hasher.update(&len.to_be_bytes());
    hasher.update(payload);
    hasher.finalize()
}

fn damaged(offset: u64, id: RecordId, reason: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("damaged frame for record {id} at offset {offset}: {reason}"),
    )
}

struct Replay {
    index: HashMap<RecordId, Slot>,
    next_id: RecordId,
    end: u64,
}

fn replay(file: &mut File) -> io::Result<Replay> {
    let file_len = file.metadata()?.len();
    file.seek(SeekFrom::Start(HEADER_SIZE))?;
    let mut reader = BufReader::new(file);

    let mut index = HashMap::new();
    let mut next_id: RecordId = 1;
    let mut offset = HEADER_SIZE;

    loop {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let kind = header[0];
        let id = i32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        let len = u32::from_be_bytes([header[5], header[6], header[7], header[8]]);
        let crc = u32::from_be_bytes([header[9], header[10], header[11], header[12]]);

        let payload_offset = offset + FRAME_HEADER_SIZE as u64;
        let frame_end = payload_offset + u64::from(len);
        if frame_end > file_len {
            break;
        }
        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload)?;

        if frame_crc(kind, id, len, &payload) != crc {
            if frame_end == file_len {
                break;
            }
            return Err(damaged(offset, id, "checksum mismatch"));
        }

        match kind {
            KIND_PUT => {
                index.insert(
                    id,
                    Slot {
                        offset: payload_offset,
                        len,
                    },
                );
            }
            KIND_REMOVE => {
                index.remove(&id);
            }
            _ => return Err(damaged(offset, id, "unknown frame kind")),
        }
        next_id = next_id.max(id.saturating_add(1));
        offset = payload_offset + u64::from(len);
    }

    Ok(Replay {
        index,
        next_id,
        end: offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_load() {
        let dir = TempDir::new().unwrap();
        let mut store = FileRecordStore::open(dir.path()).unwrap();

        let a = store.store(b"alpha").unwrap();
        let b = store.store(b"").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.load(a).unwrap(), b"alpha");
        assert!(store.load(b).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_preserves_records() {
        let dir = TempDir::new().unwrap();
        let (kept, removed) = {
            let mut store = FileRecordStore::open(dir.path()).unwrap();
            let kept = store.store(b"kept").unwrap();
            let removed = store.store(b"removed").unwrap();
            store.remove(removed).unwrap();
            store.dispose().unwrap();
            (kept, removed)
        };

        let mut store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load(kept).unwrap(), b"kept");
        assert_eq!(
            store.load(removed).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );

        // Ids keep growing past removed ones.
        let next = store.store(b"next").unwrap();
        assert!(next > removed);
    }

    #[test]
    fn test_version_persists() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = FileRecordStore::open(dir.path()).unwrap();
            assert_eq!(store.version().unwrap(), 0);
            store.store(b"data").unwrap();
            store.set_version(17).unwrap();
            store.dispose().unwrap();
        }

        let mut store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(store.version().unwrap(), 17);
        assert_eq!(store.load(1).unwrap(), b"data");
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let id = {
            let mut store = FileRecordStore::open(dir.path()).unwrap();
            let id = store.store(b"complete").unwrap();
            store.dispose().unwrap();
            id
        };

        // Half a frame header, as left by a crash mid-append.
        let path = dir.path().join(DATA_FILE);
        let intact_len = fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[KIND_PUT, 0, 0, 0, 9, 0, 0]).unwrap();
        drop(file);

        let mut store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), intact_len);
        assert_eq!(store.load(id).unwrap(), b"complete");

        let next = store.store(b"after recovery").unwrap();
        store.dispose().unwrap();

        let mut store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(store.load(next).unwrap(), b"after recovery");
    }

    #[test]
    fn test_checksum_failure_drops_frame() {
        let dir = TempDir::new().unwrap();
        let (first, second) = {
            let mut store = FileRecordStore::open(dir.path()).unwrap();
            let first = store.store(b"first").unwrap();
            let second = store.store(b"second").unwrap();
            store.dispose().unwrap();
            (first, second)
        };

        // Flip the last payload byte of the second frame.
        let path = dir.path().join(DATA_FILE);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let mut store = FileRecordStore::open(dir.path()).unwrap();
        assert_eq!(store.load(first).unwrap(), b"first");
        assert!(store.load(second).is_err());
    }

    #[test]
    fn test_damaged_middle_frame_fails_open() {
        let dir = TempDir::new().unwrap();
        let first_frame_end = {
            let mut store = FileRecordStore::open(dir.path()).unwrap();
            store.store(b"first").unwrap();
            let end = store.end;
            for i in 2..=5 {
                store.store(format!("record {i}").as_bytes()).unwrap();
            }
            store.dispose().unwrap();
            end
        };

        // Flip the last payload byte of the first frame; four intact frames follow.
        let path = dir.path().join(DATA_FILE);
        let mut bytes = fs::read(&path).unwrap();
        bytes[first_frame_end as usize - 1] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let err = FileRecordStore::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains(&format!("offset {HEADER_SIZE}")));

        // Nothing was cut away.
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DATA_FILE), b"NOTASTOREFILE").unwrap();

        let err = FileRecordStore::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_disposed_store_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = FileRecordStore::open(dir.path()).unwrap();
        let id = store.store(b"x").unwrap();
        store.dispose().unwrap();

        assert!(store.load(id).is_err());
        assert!(store.store(b"y").is_err());
        assert!(store.force().is_err());
        // Disposing twice is harmless.
        store.dispose().unwrap();
    }
}
