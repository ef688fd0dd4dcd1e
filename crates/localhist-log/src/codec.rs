//! Tagged encoding of change and entry records.
//!
//! Every record starts with a 4-byte tag naming its variant, followed by the
//! variant's own payload. Tags are part of the on-disk format and must never
//! be renumbered.

use crate::change::{
    ContentChange, CreateDirectory, CreateFile, Delete, Move, PutLabel, PutSystemLabel,
    ReadOnlyStatusChange, Rename,
};
use crate::entry::{DirectoryEntry, FileEntry};
use crate::{Change, Entry, LogError, LogReader, LogWriter, RecordKind, Result};
use std::io::{Read, Write};

/// Change variants and their wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Tag 1: [`CreateFile`].
    CreateFile,
    /// Tag 2: [`CreateDirectory`].
    CreateDirectory,
    /// Tag 3: [`ContentChange`].
    ContentChange,
    /// Tag 4: [`Rename`].
    Rename,
    /// Tag 5: [`ReadOnlyStatusChange`].
    ReadOnlyStatusChange,
    /// Tag 6: [`Move`].
    Move,
    /// Tag 7: [`Delete`].
    Delete,
    /// Tag 8: [`PutLabel`].
    PutLabel,
    /// Tag 9: [`PutSystemLabel`].
    PutSystemLabel,
}

impl ChangeKind {
    /// All kinds in tag order.
    pub const ALL: [ChangeKind; 9] = [
        Self::CreateFile,
        Self::CreateDirectory,
        Self::ContentChange,
        Self::Rename,
        Self::ReadOnlyStatusChange,
        Self::Move,
        Self::Delete,
        Self::PutLabel,
        Self::PutSystemLabel,
    ];

    /// Returns the wire tag.
    pub fn tag(&self) -> i32 {
        match self {
            Self::CreateFile => 1,
            Self::CreateDirectory => 2,
            Self::ContentChange => 3,
            Self::Rename => 4,
            Self::ReadOnlyStatusChange => 5,
            Self::Move => 6,
            Self::Delete => 7,
            Self::PutLabel => 8,
            Self::PutSystemLabel => 9,
        }
    }

    /// Looks up a wire tag.
    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            1 => Ok(Self::CreateFile),
            2 => Ok(Self::CreateDirectory),
            3 => Ok(Self::ContentChange),
            4 => Ok(Self::Rename),
            5 => Ok(Self::ReadOnlyStatusChange),
            6 => Ok(Self::Move),
            7 => Ok(Self::Delete),
            8 => Ok(Self::PutLabel),
            9 => Ok(Self::PutSystemLabel),
            _ => Err(LogError::UnknownRecordType {
                kind: RecordKind::Change,
                tag,
            }),
        }
    }

    /// Returns the variant name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateFile => "CreateFile",
            Self::CreateDirectory => "CreateDirectory",
            Self::ContentChange => "ContentChange",
            Self::Rename => "Rename",
            Self::ReadOnlyStatusChange => "ReadOnlyStatusChange",
            Self::Move => "Move",
            Self::Delete => "Delete",
            Self::PutLabel => "PutLabel",
            Self::PutSystemLabel => "PutSystemLabel",
        }
    }
}

impl Change {
    /// Returns the variant kind.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::CreateFile(_) => ChangeKind::CreateFile,
            Self::CreateDirectory(_) => ChangeKind::CreateDirectory,
            Self::ContentChange(_) => ChangeKind::ContentChange,
            Self::Rename(_) => ChangeKind::Rename,
            Self::ReadOnlyStatusChange(_) => ChangeKind::ReadOnlyStatusChange,
            Self::Move(_) => ChangeKind::Move,
            Self::Delete(_) => ChangeKind::Delete,
            Self::PutLabel(_) => ChangeKind::PutLabel,
            Self::PutSystemLabel(_) => ChangeKind::PutSystemLabel,
        }
    }
}

/// Entry variants and their wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Tag 0: [`FileEntry`].
    File,
    /// Tag 1: [`DirectoryEntry`].
    Directory,
}

impl EntryKind {
    /// Returns the wire tag.
    pub fn tag(&self) -> i32 {
        match self {
            Self::File => 0,
            Self::Directory => 1,
        }
    }

    /// Looks up a wire tag.
    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(Self::File),
            1 => Ok(Self::Directory),
            _ => Err(LogError::UnknownRecordType {
                kind: RecordKind::Entry,
                tag,
            }),
        }
    }
}

impl Entry {
    /// Returns the variant kind.
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::File(_) => EntryKind::File,
            Self::Directory(_) => EntryKind::Directory,
        }
    }
}

/// Writes a change: tag, then payload.
pub fn write_change<W: Write>(out: &mut LogWriter<W>, change: &Change) -> Result<()> {
    out.write_i32(change.kind().tag())?;
    match change {
        Change::CreateFile(c) => c.write(out),
        Change::CreateDirectory(c) => c.write(out),
        Change::ContentChange(c) => c.write(out),
        Change::Rename(c) => c.write(out),
        Change::ReadOnlyStatusChange(c) => c.write(out),
        Change::Move(c) => c.write(out),
        Change::Delete(c) => c.write(out),
        Change::PutLabel(c) => c.write(out),
        Change::PutSystemLabel(c) => c.write(out),
    }
}

/// Reads a change written by [`write_change`].
///
/// An unknown tag fails with [`LogError::UnknownRecordType`].
pub fn read_change<R: Read>(input: &mut LogReader<R>) -> Result<Change> {
    let kind = ChangeKind::from_tag(input.read_i32()?)?;
    Ok(match kind {
        ChangeKind::CreateFile => Change::CreateFile(CreateFile::read(input)?),
        ChangeKind::CreateDirectory => Change::CreateDirectory(CreateDirectory::read(input)?),
        ChangeKind::ContentChange => Change::ContentChange(ContentChange::read(input)?),
        ChangeKind::Rename => Change::Rename(Rename::read(input)?),
        ChangeKind::ReadOnlyStatusChange => {
            Change::ReadOnlyStatusChange(ReadOnlyStatusChange::read(input)?)
        }
        ChangeKind::Move => Change::Move(Move::read(input)?),
        ChangeKind::Delete => Change::Delete(Delete::read(input)?),
        ChangeKind::PutLabel => Change::PutLabel(PutLabel::read(input)?),
        ChangeKind::PutSystemLabel => Change::PutSystemLabel(PutSystemLabel::read(input)?),
    })
}

/// Writes a tree entry: tag, then payload.
pub fn write_entry<W: Write>(out: &mut LogWriter<W>, entry: &Entry) -> Result<()> {
    out.write_i32(entry.kind().tag())?;
    match entry {
        Entry::File(e) => e.write(out),
        Entry::Directory(e) => e.write(out),
    }
}

/// Reads a tree entry written by [`write_entry`].
pub fn read_entry<R: Read>(input: &mut LogReader<R>) -> Result<Entry> {
    Ok(match EntryKind::from_tag(input.read_i32()?)? {
        EntryKind::File => Entry::File(FileEntry::read(input)?),
        EntryKind::Directory => Entry::Directory(DirectoryEntry::read(input)?),
    })
}

/// Encodes a change into a standalone buffer.
pub fn encode_change(change: &Change) -> Result<Vec<u8>> {
    let mut out = LogWriter::new(Vec::new());
    write_change(&mut out, change)?;
    Ok(out.into_inner())
}
