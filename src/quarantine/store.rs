//! Quarantine store
//!
//! Persists the invalid rows of a batch together with the report that
//! condemned them. Entries are write-once: a name collision is an error and
//! the existing entry is left untouched.

use chrono::{DateTime, SecondsFormat, Utc};
use std::io;
use tracing::{debug, info};

use super::entry::QuarantineEntry;
use super::errors::{QuarantineError, QuarantineResult};
use super::medium::QuarantineMedium;
use crate::batch::Row;
use crate::observability::Event;
use crate::validation::ErrorReport;

/// Prefix shared by every entry identifier
pub const ENTRY_PREFIX: &str = "quarantine_";

/// Suffix shared by every entry identifier
pub const ENTRY_SUFFIX: &str = ".json";

/// An entry that was written, with the identifier it was stored under
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: String,
    pub entry: QuarantineEntry,
}

/// Quarantine store over a durable medium
#[derive(Debug)]
pub struct QuarantineStore<M> {
    medium: M,
}

impl<M: QuarantineMedium> QuarantineStore<M> {
    /// Creates a store writing to `medium`
    pub fn new(medium: M) -> Self {
        Self { medium }
    }

    /// Returns the underlying medium
    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Quarantines `invalid_rows`, stamped with the current time.
    ///
    /// Returns `Ok(None)` without touching the medium when there is nothing
    /// to quarantine.
    pub fn quarantine(
        &self,
        invalid_rows: &[Row],
        source: &str,
        report: &ErrorReport,
    ) -> QuarantineResult<Option<StoredEntry>> {
        self.quarantine_at(invalid_rows, source, report, Utc::now())
    }

    /// Quarantines `invalid_rows` as if written at `now`.
    pub fn quarantine_at(
        &self,
        invalid_rows: &[Row],
        source: &str,
        report: &ErrorReport,
        now: DateTime<Utc>,
    ) -> QuarantineResult<Option<StoredEntry>> {
        if invalid_rows.is_empty() {
            debug!(event = Event::QuarantineSkipped.as_str(), source, "no invalid rows");
            return Ok(None);
        }

        let id = entry_id(source, now);
        let entry = QuarantineEntry {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
            source: source.to_string(),
            total_invalid_rows: invalid_rows.len(),
            validation_report: report.clone(),
            invalid_data: invalid_rows.to_vec(),
        };
        let payload = serde_json::to_vec_pretty(&entry)?;

        self.medium.create(&id, &payload).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                QuarantineError::AlreadyExists(id.clone())
            } else {
                QuarantineError::unavailable(format!("writing {}", id), e)
            }
        })?;

        info!(
            event = Event::QuarantineWritten.as_str(),
            id = %id,
            source,
            rows = entry.total_invalid_rows,
            "quarantined invalid rows"
        );
        Ok(Some(StoredEntry { id, entry }))
    }

    /// Lists entry identifiers, oldest first for a given source.
    pub fn list_entries(&self) -> QuarantineResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .medium
            .list()
            .map_err(|e| QuarantineError::unavailable("listing entries", e))?
            .into_iter()
            .filter(|id| is_entry_id(id))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Loads one entry by identifier
    pub fn load_entry(&self, id: &str) -> QuarantineResult<QuarantineEntry> {
        if !is_entry_id(id) {
            return Err(QuarantineError::NotFound(id.to_string()));
        }

        let payload = self.medium.read(id).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                QuarantineError::NotFound(id.to_string())
            } else {
                QuarantineError::unavailable(format!("reading {}", id), e)
            }
        })?;

        serde_json::from_slice(&payload).map_err(|e| QuarantineError::CorruptEntry {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Builds the identifier for an entry: `quarantine_{source}_{YYYYMMDD_HHMMSS}.json`.
///
/// Characters outside `[A-Za-z0-9_-]` in the source are replaced so the
/// identifier is always a single safe file name.
pub fn entry_id(source: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}{}_{}{}",
        ENTRY_PREFIX,
        sanitize_source(source),
        now.format("%Y%m%d_%H%M%S"),
        ENTRY_SUFFIX
    )
}

fn sanitize_source(source: &str) -> String {
    let cleaned: String = source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn is_entry_id(id: &str) -> bool {
    id.starts_with(ENTRY_PREFIX)
        && id.ends_with(ENTRY_SUFFIX)
        && !id.contains(['/', '\\'])
        && !id.contains("..")
}
