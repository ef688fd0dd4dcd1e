//! CLI command implementations.

use localhist_log::{Change, ChangeLog, LogError};
use localhist_storage::{
    create_content_storage_with, Content, RecordId, StorageConfig, StorageCorruption,
    ThreadSafeStorage,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageCorruption),

    #[error("change log: {0}")]
    Log(#[from] LogError),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Opens the content storage in `dir`.
pub fn open(dir: &Path, config: &StorageConfig) -> Result<Arc<ThreadSafeStorage>> {
    Ok(create_content_storage_with(dir, config)?)
}

/// Flushes and closes the storage.
pub fn close(storage: &ThreadSafeStorage) -> Result<()> {
    storage.flush()?;
    storage.close()?;
    Ok(())
}

/// Store a file's bytes.
pub fn put(storage: &ThreadSafeStorage, file: &Path, out: &mut impl Write) -> Result<RecordId> {
    let bytes = std::fs::read(file)?;
    let id = storage.store(&bytes)?;
    tracing::info!(id, file = %file.display(), len = bytes.len(), "stored file");
    writeln!(out, "{id}")?;
    Ok(id)
}

/// Write stored bytes.
pub fn cat(storage: &ThreadSafeStorage, id: RecordId, out: &mut impl Write) -> Result<()> {
    let bytes = storage.load(id)?;
    out.write_all(&bytes)?;
    Ok(())
}

/// Remove stored bytes.
pub fn rm(storage: &ThreadSafeStorage, id: RecordId) -> Result<()> {
    storage.remove(id)?;
    tracing::info!(id, "removed record");
    Ok(())
}

/// Show, or replace, the version stamp.
pub fn version(storage: &ThreadSafeStorage, set: Option<i32>, out: &mut impl Write) -> Result<()> {
    if let Some(version) = set {
        storage.set_version(version)?;
    }
    writeln!(out, "{}", storage.version()?)?;
    Ok(())
}

/// Print every change in a change log, one per line.
pub fn log(
    storage: &Arc<ThreadSafeStorage>,
    path: &Path,
    reverse: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut log = ChangeLog::open(path, storage)?;
    let changes = if reverse { log.backward() } else { log.forward() };
    for change in changes {
        writeln!(out, "{}", describe(&change?))?;
    }
    Ok(())
}

fn describe(change: &Change) -> String {
    let mut line = format!("{:>6} {:<20}", change.id(), change.kind().as_str());
    match change {
        Change::PutLabel(label) => line.push_str(&format!(" \"{}\"", label.name)),
        Change::PutSystemLabel(label) => {
            line.push_str(&format!(" \"{}\" #{:06x}", label.name, label.color));
        }
        _ => {
            if let Some(path) = change.path() {
                line.push(' ');
                line.push_str(path);
            }
        }
    }
    let ids: Vec<String> = change.contents().into_iter().map(content_ref).collect();
    if !ids.is_empty() {
        line.push_str(&format!(" [{}]", ids.join(", ")));
    }
    line
}

fn content_ref(content: &Content) -> String {
    match content.id() {
        Some(id) => format!("@{id}"),
        None => "unavailable".to_string(),
    }
}
