//! Durable backing for the outbox queue.
//!
//! The file format is JSON Lines: one [`OutboxEntry`] per line, rewritten in
//! full on every change through a temp file, fsync and rename. Lines that do
//! not parse are kept verbatim at the head of the file so a rewrite never
//! destroys a record someone may still recover by hand.

use super::entry::OutboxEntry;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("outbox I/O error: {0}")]
    Io(String),

    #[error("outbox serialization error: {0}")]
    Serialize(String),
}

/// Whole-queue load/save. Callers serialize access; implementations only
/// need to make each `save` atomic.
pub trait OutboxStore: Send + Sync {
    fn load(&self) -> Result<Vec<OutboxEntry>, StoreError>;
    fn save(&self, entries: &[OutboxEntry]) -> Result<(), StoreError>;
}

pub struct FileOutboxStore {
    path: PathBuf,
    /// Raw unparsable lines seen by the last `load`, written back on `save`.
    unreadable: Mutex<Vec<String>>,
}

impl FileOutboxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            unreadable: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutboxStore for FileOutboxStore {
    fn load(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", self.path.display()))),
        };

        let mut entries = Vec::new();
        let mut unreadable = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<OutboxEntry>(trimmed) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = line_no + 1,
                        error = %e,
                        "skipping unreadable outbox entry"
                    );
                    unreadable.push(trimmed.to_string());
                }
            }
        }
        *self.unreadable.lock().unwrap_or_else(PoisonError::into_inner) = unreadable;
        Ok(entries)
    }

    fn save(&self, entries: &[OutboxEntry]) -> Result<(), StoreError> {
        let unreadable = self
            .unreadable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        write_atomic(&self.path, &unreadable, entries)
    }
}

fn write_atomic(path: &Path, raw_lines: &[String], entries: &[OutboxEntry]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let io_err = |e: std::io::Error| StoreError::Io(format!("{}: {e}", tmp_path.display()));
    let write_result = (|| -> Result<(), StoreError> {
        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        for line in raw_lines {
            writeln!(writer, "{line}").map_err(io_err)?;
        }
        for entry in entries {
            let line = serde_json::to_string(entry).map_err(|e| StoreError::Serialize(e.to_string()))?;
            writeln!(writer, "{line}").map_err(io_err)?;
        }
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Io(format!("{} -> {}: {e}", tmp_path.display(), path.display()))
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

/// Non-durable store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryOutboxStore {
    entries: Mutex<Vec<OutboxEntry>>,
}

impl MemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutboxStore for MemoryOutboxStore {
    fn load(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, entries: &[OutboxEntry]) -> Result<(), StoreError> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.to_vec();
        Ok(())
    }
}
