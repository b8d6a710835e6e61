//! Append-only record journal
//!
//! The journal is the only durable state of the record store. Each line is
//! one committed transaction:
//!
//! ```text
//! <crc32 as 8 hex digits>\t<JournalEntry as JSON>\n
//! ```
//!
//! A transaction carries every mutation it made together with the audit
//! event describing it, so data and audit trail commit atomically. Lines are
//! fsynced before the caller sees success. On open the whole journal is
//! replayed; any checksum or framing failure refuses to open the store.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::checksum::{compute_checksum, format_checksum, parse_checksum, verify_checksum};
use super::errors::{StorageError, StorageResult};
use crate::batch::Row;
use crate::observability::AuditEvent;
use crate::schema::TableKind;

/// Journal file name inside the data directory
pub const JOURNAL_FILE: &str = "journal.log";

/// One row-level mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Insert {
        table: TableKind,
        row_id: u64,
        row: Row,
    },
    /// Replaces the stored row wholesale
    Update {
        table: TableKind,
        row_id: u64,
        row: Row,
    },
    Delete { table: TableKind, row_id: u64 },
}

/// A mutation and the audit event it emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub mutation: Mutation,
    pub audit: AuditEvent,
}

/// One committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Strictly increasing from 1
    pub seq: u64,
    pub changes: Vec<Change>,
}

/// Append handle on the journal file.
pub struct Journal {
    path: PathBuf,
    file: File,
    last_seq: u64,
}

impl Journal {
    /// Opens or creates `<data_dir>/journal.log` and replays it.
    ///
    /// Returns the handle and every committed entry in commit order.
    pub fn open(data_dir: &Path) -> StorageResult<(Self, Vec<JournalEntry>)> {
        fs::create_dir_all(data_dir).map_err(|e| {
            StorageError::write_failed(
                format!("creating data directory {}", data_dir.display()),
                e,
            )
        })?;

        let path = data_dir.join(JOURNAL_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StorageError::write_failed(format!("opening journal {}", path.display()), e)
            })?;

        let entries = Self::replay(&path)?;
        let last_seq = entries.last().map(|e| e.seq).unwrap_or(0);

        Ok((
            Self {
                path,
                file,
                last_seq,
            },
            entries,
        ))
    }

    fn replay(path: &Path) -> StorageResult<Vec<JournalEntry>> {
        let file = File::open(path)
            .map_err(|e| StorageError::read_failed(format!("reading {}", path.display()), e))?;

        let mut entries: Vec<JournalEntry> = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| {
                StorageError::read_failed(format!("reading journal line {}", line_no), e)
            })?;
            if line.is_empty() {
                continue;
            }

            let entry = decode_line(line_no, &line)?;
            let expected = entries.last().map(|e| e.seq + 1).unwrap_or(1);
            if entry.seq != expected {
                return Err(StorageError::corruption(
                    line_no,
                    format!("sequence {} follows {}", entry.seq, expected - 1),
                ));
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Returns the journal path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of the last committed entry, 0 if none.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Commits `changes` as one entry, fsynced before returning.
    pub fn append(&mut self, changes: Vec<Change>) -> StorageResult<JournalEntry> {
        let entry = JournalEntry {
            seq: self.last_seq + 1,
            changes,
        };
        let line = encode_line(&entry)?;

        self.file.write_all(line.as_bytes()).map_err(|e| {
            StorageError::write_failed(format!("appending journal entry {}", entry.seq), e)
        })?;
        self.file.sync_all().map_err(|e| {
            StorageError::write_failed(format!("fsync after journal entry {}", entry.seq), e)
        })?;

        self.last_seq = entry.seq;
        Ok(entry)
    }
}

fn encode_line(entry: &JournalEntry) -> StorageResult<String> {
    let body = serde_json::to_string(entry)?;
    let checksum = compute_checksum(body.as_bytes());
    Ok(format!("{}\t{}\n", format_checksum(checksum), body))
}

fn decode_line(line_no: usize, line: &str) -> StorageResult<JournalEntry> {
    let (prefix, body) = line
        .split_once('\t')
        .ok_or_else(|| StorageError::corruption(line_no, "missing checksum separator"))?;
    let expected = parse_checksum(prefix)
        .ok_or_else(|| StorageError::corruption(line_no, "malformed checksum"))?;
    if !verify_checksum(body.as_bytes(), expected) {
        return Err(StorageError::corruption(line_no, "checksum mismatch"));
    }
    serde_json::from_str(body).map_err(|e| StorageError::corruption(line_no, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::row_from_value;
    use crate::observability::AuditAction;
    use serde_json::json;
    use tempfile::TempDir;

    fn insert_change(row_id: u64) -> Change {
        let row = row_from_value(json!({"operation_id": row_id})).unwrap();
        Change {
            mutation: Mutation::Insert {
                table: TableKind::Operations,
                row_id,
                row,
            },
            audit: AuditEvent::new(
                TableKind::Operations,
                AuditAction::Insert,
                json!(row_id),
                "tester",
            ),
        }
    }

    #[test]
    fn test_empty_journal() {
        let tmp = TempDir::new().unwrap();
        let (journal, entries) = Journal::open(tmp.path()).unwrap();
        assert!(entries.is_empty());
        assert_eq!(journal.last_seq(), 0);
        assert!(journal.path().exists());
    }

    #[test]
    fn test_append_then_replay() {
        let tmp = TempDir::new().unwrap();
        {
            let (mut journal, _) = Journal::open(tmp.path()).unwrap();
            journal.append(vec![insert_change(1)]).unwrap();
            let second = journal.append(vec![insert_change(2)]).unwrap();
            assert_eq!(second.seq, 2);
        }

        let (journal, entries) = Journal::open(tmp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].changes[0].mutation, insert_change(2).mutation);
        assert_eq!(journal.last_seq(), 2);
    }

    #[test]
    fn test_flipped_byte_refuses_to_open() {
        let tmp = TempDir::new().unwrap();
        {
            let (mut journal, _) = Journal::open(tmp.path()).unwrap();
            journal.append(vec![insert_change(1)]).unwrap();
        }

        let path = tmp.path().join(JOURNAL_FILE);
        let tampered = fs::read_to_string(&path)
            .unwrap()
            .replace("\"operation_id\":1", "\"operation_id\":7");
        fs::write(&path, tampered).unwrap();

        match Journal::open(tmp.path()) {
            Err(StorageError::Corruption { line, reason }) => {
                assert_eq!(line, 1);
                assert_eq!(reason, "checksum mismatch");
            }
            other => panic!("expected corruption, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unframed_line_refuses_to_open() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(JOURNAL_FILE), "{\"seq\":1,\"changes\":[]}\n").unwrap();
        let err = Journal::open(tmp.path()).map(|_| ()).unwrap_err();
        assert_eq!(err.code(), "SECMAR_DATA_CORRUPTION");
    }

    #[test]
    fn test_sequence_gap_refuses_to_open() {
        let tmp = TempDir::new().unwrap();
        let entry = JournalEntry {
            seq: 5,
            changes: vec![],
        };
        fs::write(tmp.path().join(JOURNAL_FILE), encode_line(&entry).unwrap()).unwrap();
        let err = Journal::open(tmp.path()).map(|_| ()).unwrap_err();
        assert!(matches!(err, StorageError::Corruption { line: 1, .. }));
    }
}
