//! Sequential change log file.
//!
//! On-disk format:
//! ```text
//! [4 bytes: magic "LHCL"][4 bytes: version (big-endian i32)]
//! record*
//!
//! record:
//! [4 bytes: payload length (big-endian u32)]
//! [4 bytes: CRC32 of payload]
//! [N bytes: payload (one encoded change)]
//! [4 bytes: payload length again]
//! ```
//!
//! The trailing length lets the log be walked backwards from its end. On
//! open the file is scanned front to back. A damaged record that reaches the
//! end of the file is where an interrupted append stopped, and the file is
//! cut there. A damaged record with intact data behind it fails the open and
//! the file is left as it is.

use crate::{encode_change, read_change, Change, LogError, LogReader, Result};
use localhist_storage::ThreadSafeStorage;
use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const MAGIC: &[u8; 4] = b"LHCL";
const HEADER_SIZE: u64 = 8;
const FRAME_OVERHEAD: u64 = 12;

/// An append-only, version-stamped file of change records.
pub struct ChangeLog {
    path: PathBuf,
    file: File,
    storage: Arc<ThreadSafeStorage>,
    end: u64,
    len: usize,
    version: i32,
}

impl ChangeLog {
    /// Opens or creates a change log. Content in decoded changes resolves
    /// against `storage`.
    pub fn open<P: AsRef<Path>>(path: P, storage: &Arc<ThreadSafeStorage>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.metadata()?.len() < HEADER_SIZE {
            debug!(path = %path.display(), "initializing change log");
            file.set_len(0)?;
            write_header(&mut file, 0)?;
            file.sync_data()?;
        }
        let version = read_header(&mut file)?;

        let file_len = file.metadata()?.len();
        let mut end = HEADER_SIZE;
        let mut len = 0;
        while end < file_len {
            match read_frame(&mut file, end, file_len) {
                Ok((_, next)) => {
                    end = next;
                    len += 1;
                }
                Err(LogError::TornRecord { offset }) => {
                    if is_torn_tail(&mut file, offset, file_len)? {
                        break;
                    }
                    warn!(path = %path.display(), offset, "damaged record inside change log");
                    return Err(LogError::TornRecord { offset });
                }
                Err(e) => return Err(e),
            }
        }
        if end < file_len {
            warn!(
                path = %path.display(),
                valid = end,
                dropped = file_len - end,
                "truncating damaged tail of change log"
            );
            file.set_len(end)?;
            file.sync_data()?;
        }

        debug!(path = %path.display(), records = len, version, "opened change log");
        Ok(Self {
            path,
            file,
            storage: Arc::clone(storage),
            end,
            len,
            version,
        })
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the version stamp.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Replaces the version stamp.
    pub fn set_version(&mut self, version: i32) -> Result<()> {
        write_header(&mut self.file, version)?;
        self.version = version;
        Ok(())
    }

    /// Appends one change and returns the offset of its record.
    pub fn append(&mut self, change: &Change) -> Result<u64> {
        let payload = encode_change(change)?;
        self.append_payload(&payload)
    }

    fn append_payload(&mut self, payload: &[u8]) -> Result<u64> {
        let len = u32::try_from(payload.len())
            .map_err(|_| LogError::TooLarge(format!("record of {} bytes", payload.len())))?;
        let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD as usize);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&crc32fast::hash(payload).to_be_bytes());
        frame.extend_from_slice(payload);
        frame.extend_from_slice(&len.to_be_bytes());

        let offset = self.end;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&frame)?;
        self.end = offset + frame.len() as u64;
        self.len += 1;
        Ok(offset)
    }

    /// Forces appended records to stable storage.
    pub fn flush(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Iterates from the oldest record to the newest.
    pub fn forward(&mut self) -> Changes<'_> {
        self.changes(Direction::Forward)
    }

    /// Iterates from the newest record to the oldest.
    pub fn backward(&mut self) -> Changes<'_> {
        self.changes(Direction::Backward)
    }

    fn changes(&mut self, direction: Direction) -> Changes<'_> {
        Changes {
            file: &mut self.file,
            storage: &self.storage,
            front: HEADER_SIZE,
            back: self.end,
            direction,
            done: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Iterator over decoded changes.
///
/// Yields at most one error, after which it is exhausted.
pub struct Changes<'a> {
    file: &'a mut File,
    storage: &'a Arc<ThreadSafeStorage>,
    front: u64,
    back: u64,
    direction: Direction,
    done: bool,
}

impl Changes<'_> {
    fn next_payload(&mut self) -> Result<Vec<u8>> {
        match self.direction {
            Direction::Forward => {
                let (payload, next) = read_frame(self.file, self.front, self.back)?;
                self.front = next;
                Ok(payload)
            }
            Direction::Backward => {
                let end = self.back;
                if end < self.front + FRAME_OVERHEAD {
                    return Err(LogError::TornRecord { offset: end });
                }
                self.file.seek(SeekFrom::Start(end - 4))?;
                let len = u64::from(read_u32(self.file)?);
                let start = end
                    .checked_sub(FRAME_OVERHEAD + len)
                    .filter(|start| *start >= self.front)
                    .ok_or(LogError::TornRecord { offset: end })?;
                let (payload, next) = read_frame(self.file, start, end)?;
                if next != end {
                    return Err(LogError::TornRecord { offset: start });
                }
                self.back = start;
                Ok(payload)
            }
        }
    }
}

impl Iterator for Changes<'_> {
    type Item = Result<Change>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.front >= self.back {
            return None;
        }
        let result = self.next_payload().and_then(|payload| {
            read_change(&mut LogReader::new(Cursor::new(payload), self.storage))
        });
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

fn write_header(file: &mut File, version: i32) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE as usize];
    header[..4].copy_from_slice(MAGIC);
    header[4..].copy_from_slice(&version.to_be_bytes());
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header)?;
    Ok(())
}

fn read_header(file: &mut File) -> Result<i32> {
    let mut header = [0u8; HEADER_SIZE as usize];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut header)?;
    if &header[..4] != MAGIC {
        return Err(LogError::InvalidHeader);
    }
    Ok(i32::from_be_bytes([header[4], header[5], header[6], header[7]]))
}

fn read_u32(file: &mut File) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Returns true if the damaged record at `offset` is the last thing in the
/// file: its header is short, or its declared extent reaches the end.
fn is_torn_tail(file: &mut File, offset: u64, file_len: u64) -> Result<bool> {
    if offset + FRAME_OVERHEAD > file_len {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(offset))?;
    let len = u64::from(read_u32(file)?);
    Ok(offset + FRAME_OVERHEAD + len >= file_len)
}

/// Reads and verifies the record at `offset`, which must end by `limit`.
/// Returns the payload and the offset just past the record.
fn read_frame(file: &mut File, offset: u64, limit: u64) -> Result<(Vec<u8>, u64)> {
    let torn = LogError::TornRecord { offset };
    if offset + FRAME_OVERHEAD > limit {
        return Err(torn);
    }
    file.seek(SeekFrom::Start(offset))?;
    let len = read_u32(file)?;
    let crc = read_u32(file)?;
    let next = offset + FRAME_OVERHEAD + u64::from(len);
    if next > limit {
        return Err(torn);
    }

    let mut payload = vec![0u8; len as usize];
    file.read_exact(&mut payload)?;
    let trailer = read_u32(file)?;
    if trailer != len || crc32fast::hash(&payload) != crc {
        return Err(torn);
    }
    Ok((payload, next))
}
