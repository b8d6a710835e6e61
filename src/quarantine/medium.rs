//! Durable media for quarantine entries
//!
//! A medium stores opaque payloads by identifier. The only write it offers is
//! create-if-absent, which must be atomic against concurrent writers.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

/// Storage behind a quarantine store.
pub trait QuarantineMedium: Send + Sync {
    /// Stores `contents` under `id`.
    ///
    /// Fails with `io::ErrorKind::AlreadyExists` if `id` is taken. Readers
    /// never observe a partially written payload.
    fn create(&self, id: &str, contents: &[u8]) -> io::Result<()>;

    /// Reads the payload stored under `id`; `io::ErrorKind::NotFound` if absent.
    fn read(&self, id: &str) -> io::Result<Vec<u8>>;

    /// Lists stored identifiers.
    fn list(&self) -> io::Result<Vec<String>>;
}

/// Directory-backed medium: one file per entry.
///
/// Payloads go to a uniquely named temporary file first, are synced, then
/// hard-linked to the final name. `link` fails if the name exists, so two
/// writers can never overwrite each other.
#[derive(Debug, Clone)]
pub struct FsMedium {
    dir: PathBuf,
}

impl FsMedium {
    /// Creates a medium rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl QuarantineMedium for FsMedium {
    fn create(&self, id: &str, contents: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let final_path = self.dir.join(id);
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", id, Uuid::new_v4()));

        let written = (|| {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)?;
            file.write_all(contents)?;
            file.sync_all()?;
            fs::hard_link(&tmp_path, &final_path)
        })();

        // The temporary name is private to this call; it never outlives it.
        let _ = fs::remove_file(&tmp_path);
        written
    }

    fn read(&self, id: &str) -> io::Result<Vec<u8>> {
        fs::read(self.dir.join(id))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-memory medium for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryMedium {
    /// Creates an empty medium
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites a payload, bypassing create-if-absent (test fixture only)
    #[cfg(test)]
    pub(crate) fn put_raw(&self, id: &str, contents: &[u8]) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), contents.to_vec());
    }
}

impl QuarantineMedium for MemoryMedium {
    fn create(&self, id: &str, contents: &[u8]) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(id) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", id),
            ));
        }
        entries.insert(id.to_string(), contents.to_vec());
        Ok(())
    }

    fn read(&self, id: &str) -> io::Result<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", id)))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}
