//! Tree entries embedded in change records.

use crate::{LogReader, LogWriter, Result};
use localhist_storage::Content;
use std::io::{Read, Write};

/// A snapshot of a file or directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A file and its content at snapshot time.
    File(FileEntry),
    /// A directory and its children.
    Directory(DirectoryEntry),
}

impl Entry {
    /// Returns the entry name.
    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Directory(dir) => &dir.name,
        }
    }

    /// Returns every content handle in this subtree.
    pub fn contents(&self) -> Vec<&Content> {
        let mut out = Vec::new();
        self.collect_contents(&mut out);
        out
    }

    fn collect_contents<'a>(&'a self, out: &mut Vec<&'a Content>) {
        match self {
            Self::File(file) => out.push(&file.content),
            Self::Directory(dir) => {
                for child in &dir.children {
                    child.collect_contents(out);
                }
            }
        }
    }
}

/// A file in a tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name.
    pub name: String,
    /// Content at snapshot time.
    pub content: Content,
    /// Modification timestamp (milliseconds since the epoch).
    pub timestamp: i64,
    /// Whether the file was read-only.
    pub read_only: bool,
}

impl FileEntry {
    /// Writes the entry payload.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_string(&self.name)?;
        out.write_content(&self.content)?;
        out.write_i64(self.timestamp)?;
        out.write_bool(self.read_only)
    }

    /// Reads the entry payload.
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        Ok(Self {
            name: input.read_string()?,
            content: input.read_content()?,
            timestamp: input.read_i64()?,
            read_only: input.read_bool()?,
        })
    }
}

/// A directory in a tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Directory name.
    pub name: String,
    /// Child entries, in order.
    pub children: Vec<Entry>,
}

impl DirectoryEntry {
    /// Writes the entry payload, children included.
    pub fn write<W: Write>(&self, out: &mut LogWriter<W>) -> Result<()> {
        out.write_string(&self.name)?;
        let count = u32::try_from(self.children.len()).map_err(|_| {
            crate::LogError::TooLarge(format!("{} children", self.children.len()))
        })?;
        out.write_u32(count)?;
        for child in &self.children {
            crate::write_entry(out, child)?;
        }
        Ok(())
    }

    /// Reads the entry payload, children included.
    pub fn read<R: Read>(input: &mut LogReader<R>) -> Result<Self> {
        let name = input.read_string()?;
        let count = input.read_u32()?;
        // The count comes off the wire; grow as children actually decode.
        let children = input.nested(|input| {
            let mut children = Vec::new();
            for _ in 0..count {
                children.push(crate::read_entry(input)?);
            }
            Ok(children)
        })?;
        Ok(Self { name, children })
    }
}
