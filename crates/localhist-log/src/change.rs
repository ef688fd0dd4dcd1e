//! Change records.
//!
//! Each variant serializes its own payload through `write`/`read`; the tag
//! that precedes the payload is handled by the codec.

use crate::{Entry, LogReader, LogWriter, Result};
use localhist_storage::Content;
use std::io::{Read, Write};

/// One file system mutation recorded in the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A file was created.
    CreateFile(CreateFile),
    /// A directory was created.
    CreateDirectory(CreateDirectory),
    /// A file's content changed.
    ContentChange(ContentChange),
    /// A file or directory was renamed.
    Rename(Rename),
    /// A file's read-only flag changed.
    ReadOnlyStatusChange(ReadOnlyStatusChange),
    /// A file or directory moved to another parent.
    Move(Move),
    /// A file or directory was deleted.
    Delete(Delete),
    /// A user label was put on the history.
    PutLabel(PutLabel),
    /// A system label was put on the history.
    PutSystemLabel(PutSystemLabel),
}

impl Change {
    /// Returns the change id.
    pub fn id(&self) -> i64 {
        match self {
            Self::CreateFile(c) => c.id,
            Self::CreateDirectory(c) => c.id,
            Self::ContentChange(c) => c.id,
            Self::Rename(c) => c.id,
            Self::ReadOnlyStatusChange(c) => c.id,
            Self::Move(c) => c.id,
            Self::Delete(c) => c.id,
            Self::PutLabel(c) => c.id,
            Self::PutSystemLabel(c) => c.id,
        }
    }

    /// Returns the affected path, or `None` for labels.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::CreateFile(c) => Some(&c.path),
            Self::CreateDirectory(c) => Some(&c.path),
            Self::ContentChange(c) => Some(&c.path),
            Self::Rename(c) => Some(&c.path),
            Self::ReadOnlyStatusChange(c) => Some(&c.path),
            Self::Move(c) => Some(&c.path),
            Self::Delete(c) => Some(&c.path),
            Self::PutLabel(_) | Self::PutSystemLabel(_) => None,
        }
    }

    /// Returns every content handle the change refers to.
    ///
    /// An owner dropping this change uses these to purge the blobs.
    pub fn contents(&self) -> Vec<&Content> {
        match self {
            Self::CreateFile(c) => vec![&c.content],
            Self::ContentChange(c) => vec![&c.old_content, &c.new_content],
            Self::Delete(c) => c.entry.contents(),
            _ => Vec::new(),
        }
    }
}

/// A file was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFile {
    /// Change id.
    pub id: i64,
    /// Path of the new file.
    pub path: String,
    /// Initial content.
    pub content: Content,
    /// Modification timestamp (milliseconds since the epoch).
    pub timestamp: i64,
    /// Whether the file was created read-only.
    pub read_only: bool,
}

impl CreateFile {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)?;
        out.write_content(&self.content)?;
        out.write_i64(self.timestamp)?;
        out.write_bool(self.read_only)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
            content: input.read_content()?,
            timestamp: input.read_i64()?,
            read_only: input.read_bool()?,
        })
    }
}

/// A directory was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDirectory {
    /// Change id.
    pub id: i64,
    /// Path of the new directory.
    pub path: String,
}

impl CreateDirectory {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
        })
    }
}

/// A file's content changed from `old_content` to `new_content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// Change id.
    pub id: i64,
    /// Path of the changed file.
    pub path: String,
    /// Content before the change.
    pub old_content: Content,
    /// Timestamp of `old_content`.
    pub old_timestamp: i64,
    /// Content after the change.
    pub new_content: Content,
    /// Timestamp of `new_content`.
    pub new_timestamp: i64,
}

impl ContentChange {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)?;
        out.write_content(&self.old_content)?;
        out.write_i64(self.old_timestamp)?;
        out.write_content(&self.new_content)?;
        out.write_i64(self.new_timestamp)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
            old_content: input.read_content()?,
            old_timestamp: input.read_i64()?,
            new_content: input.read_content()?,
            new_timestamp: input.read_i64()?,
        })
    }
}

/// A file or directory was renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    /// Change id.
    pub id: i64,
    /// Path after the rename.
    pub path: String,
    /// Name before the rename.
    pub old_name: String,
    /// Name after the rename.
    pub new_name: String,
}

impl Rename {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)?;
        out.write_string(&self.old_name)?;
        out.write_string(&self.new_name)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
            old_name: input.read_string()?,
            new_name: input.read_string()?,
        })
    }
}

/// A file's read-only flag changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyStatusChange {
    /// Change id.
    pub id: i64,
    /// Path of the file.
    pub path: String,
    /// Read-only flag before the change.
    pub old_status: bool,
    /// Read-only flag after the change.
    pub new_status: bool,
}

impl ReadOnlyStatusChange {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)?;
        out.write_bool(self.old_status)?;
        out.write_bool(self.new_status)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
            old_status: input.read_bool()?,
            new_status: input.read_bool()?,
        })
    }
}

/// A file or directory moved from `old_parent` to `new_parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// Change id.
    pub id: i64,
    /// Path after the move.
    pub path: String,
    /// Parent directory before the move.
    pub old_parent: String,
    /// Parent directory after the move.
    pub new_parent: String,
}

impl Move {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)?;
        out.write_string(&self.old_parent)?;
        out.write_string(&self.new_parent)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
            old_parent: input.read_string()?,
            new_parent: input.read_string()?,
        })
    }
}

/// A file or directory was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    /// Change id.
    pub id: i64,
    /// Path of the deleted file or directory.
    pub path: String,
    /// Snapshot of the tree as it was before the delete.
    pub entry: Entry,
}

impl Delete {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_string(&self.path)?;
        crate::write_entry(out, &self.entry)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            path: input.read_string()?,
            entry: crate::read_entry(input)?,
        })
    }
}

/// A user label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutLabel {
    /// Change id.
    pub id: i64,
    /// When the label was put (milliseconds since the epoch).
    pub timestamp: i64,
    /// Label text.
    pub name: String,
    /// Project the label is scoped to; `None` for global labels.
    pub project_id: Option<String>,
}

impl PutLabel {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_i64(self.timestamp)?;
        out.write_string(&self.name)?;
        out.write_string_or_null(self.project_id.as_deref())
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            timestamp: input.read_i64()?,
            name: input.read_string()?,
            project_id: input.read_string_or_null()?,
        })
    }
}

/// A label put by the system (build, commit, test run), with a color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutSystemLabel {
    /// Change id.
    pub id: i64,
    /// When the label was put (milliseconds since the epoch).
    pub timestamp: i64,
    /// Label text.
    pub name: String,
    /// Project the label is scoped to; `None` for global labels.
    pub project_id: Option<String>,
    /// RGB color used to render the label.
    pub color: i32,
}

impl PutSystemLabel {
    /// Writes the payload, without the tag.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_i64(self.timestamp)?;
        out.write_string(&self.name)?;
        out.write_string_or_null(self.project_id.as_deref())?;
        out.write_i32(self.color)
    }

    /// Reads a payload written by [`Self::write`].
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            id: input.read_i64()?,
            timestamp: input.read_i64()?,
            name: input.read_string()?,
            project_id: input.read_string_or_null()?,
            color: input.read_i32()?,
        })
    }
}
