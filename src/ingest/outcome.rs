//! Ingestion outcome
//!
//! One outcome per batch. Partial degradation (quarantine unavailable, rows
//! refused by the store) never flips `status`; it shows in the counts and
//! the error lists.

use serde::{Deserialize, Serialize};

use crate::batch::Row;
use crate::schema::TableKind;
use crate::validation::ErrorReport;

/// Overall status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
}

/// Where the invalid rows of a batch went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuarantineRef {
    /// Every row was valid
    NotNeeded,
    /// Invalid rows were persisted under `id`
    Stored { id: String },
    /// The quarantine medium failed; rows are in `unquarantined_rows`
    Unavailable { reason: String },
}

impl QuarantineRef {
    /// Identifier of the stored entry, if one was written
    pub fn id(&self) -> Option<&str> {
        match self {
            QuarantineRef::Stored { id } => Some(id),
            _ => None,
        }
    }
}

/// A valid row that the persistence capability refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowInsertionError {
    /// Index of the row in the submitted batch
    pub row: usize,
    pub message: String,
}

/// Summary of one coordinator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub source: String,
    pub table: TableKind,
    pub status: OutcomeStatus,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub inserted_rows: usize,
    pub quarantine: QuarantineRef,
    pub validation_report: ErrorReport,
    pub insertion_errors: Vec<RowInsertionError>,
    /// Invalid rows that could not be quarantined, kept so they are not lost
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unquarantined_rows: Vec<Row>,
}

impl IngestionOutcome {
    /// Whether every submitted row ended up in the store
    pub fn is_clean(&self) -> bool {
        self.inserted_rows == self.total_rows
    }

    /// Whether invalid rows exist that were not durably quarantined
    pub fn has_unquarantined_rows(&self) -> bool {
        !self.unquarantined_rows.is_empty()
    }
}
