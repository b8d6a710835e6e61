//! Ingestion coordinator
//!
//! Runs one batch through classify, quarantine and persist, in that order,
//! and assembles the outcome. Validation and persistence are independent
//! phases: a row that validates may still be refused by the store, and that
//! refusal is reported separately from validation failures.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::outcome::{IngestionOutcome, OutcomeStatus, QuarantineRef, RowInsertionError};
use super::persist::PersistRow;
use crate::batch::{Batch, Row};
use crate::observability::Event;
use crate::quarantine::{QuarantineError, QuarantineMedium, QuarantineStore};
use crate::schema::TableSchema;
use crate::validation::{classify, ErrorReport};

/// Attempts at finding a free quarantine name before giving up
pub const DEFAULT_QUARANTINE_ATTEMPTS: usize = 5;

/// Orchestrates one ingestion run per batch
#[derive(Debug)]
pub struct IngestionCoordinator<M> {
    quarantine: QuarantineStore<M>,
    max_quarantine_attempts: usize,
}

impl<M: QuarantineMedium> IngestionCoordinator<M> {
    /// Creates a coordinator quarantining into `quarantine`
    pub fn new(quarantine: QuarantineStore<M>) -> Self {
        Self {
            quarantine,
            max_quarantine_attempts: DEFAULT_QUARANTINE_ATTEMPTS,
        }
    }

    /// Sets how many names are tried when a quarantine name is taken
    pub fn with_max_quarantine_attempts(mut self, attempts: usize) -> Self {
        self.max_quarantine_attempts = attempts.max(1);
        self
    }

    /// Returns the quarantine store
    pub fn quarantine_store(&self) -> &QuarantineStore<M> {
        &self.quarantine
    }

    /// Ingests `batch`, stamping any quarantine entry with the current time.
    pub fn ingest<P>(
        &self,
        batch: Batch,
        source: &str,
        schema: &TableSchema,
        persist: &mut P,
    ) -> IngestionOutcome
    where
        P: PersistRow + ?Sized,
    {
        self.ingest_at(batch, source, schema, persist, Utc::now())
    }

    /// Ingests `batch` as if run at `now`.
    ///
    /// 1. Classify every row lazily against `schema`
    /// 2. Quarantine the invalid rows, if any
    /// 3. Offer each valid row to `persist`, in batch order; a refusal is
    ///    recorded and the next row is tried
    pub fn ingest_at<P>(
        &self,
        batch: Batch,
        source: &str,
        schema: &TableSchema,
        persist: &mut P,
        now: DateTime<Utc>,
    ) -> IngestionOutcome
    where
        P: PersistRow + ?Sized,
    {
        let table = schema.kind();
        info!(
            event = Event::IngestBegin.as_str(),
            source,
            %table,
            rows = batch.len(),
            "ingesting batch"
        );

        let classified = classify(batch, schema, true);
        info!(
            event = Event::BatchClassified.as_str(),
            source,
            valid = classified.valid.len(),
            invalid = classified.invalid.len(),
            errors = classified.report.total_errors,
            "batch classified"
        );

        let invalid_rows = classified.invalid_rows();
        let quarantine = self.quarantine_invalid(&invalid_rows, source, &classified.report, now);
        let unquarantined_rows = match quarantine {
            QuarantineRef::Unavailable { .. } => invalid_rows,
            _ => Vec::new(),
        };

        let mut inserted_rows = 0;
        let mut insertion_errors = Vec::new();
        for valid in &classified.valid {
            match persist.persist_row(&valid.row) {
                Ok(true) => {
                    inserted_rows += 1;
                    debug!(event = Event::RowPersisted.as_str(), row = valid.index);
                }
                Ok(false) => {
                    warn!(
                        event = Event::RowPersistFailed.as_str(),
                        row = valid.index,
                        "row was not persisted"
                    );
                    insertion_errors.push(RowInsertionError {
                        row: valid.index,
                        message: "row was not persisted".to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        event = Event::RowPersistFailed.as_str(),
                        row = valid.index,
                        error = %e,
                        "row was not persisted"
                    );
                    insertion_errors.push(RowInsertionError {
                        row: valid.index,
                        message: e.to_string(),
                    });
                }
            }
        }

        let outcome = IngestionOutcome {
            source: source.to_string(),
            table,
            status: OutcomeStatus::Success,
            total_rows: classified.total_rows(),
            valid_rows: classified.valid.len(),
            invalid_rows: classified.invalid.len(),
            inserted_rows,
            quarantine,
            validation_report: classified.report,
            insertion_errors,
            unquarantined_rows,
        };

        info!(
            event = Event::IngestComplete.as_str(),
            source,
            total = outcome.total_rows,
            valid = outcome.valid_rows,
            invalid = outcome.invalid_rows,
            inserted = outcome.inserted_rows,
            "ingestion complete"
        );
        outcome
    }

    /// Writes the invalid rows, retrying under `source-2`, `source-3`, ...
    /// while the name is taken. Medium failures are not retried.
    fn quarantine_invalid(
        &self,
        rows: &[Row],
        source: &str,
        report: &ErrorReport,
        now: DateTime<Utc>,
    ) -> QuarantineRef {
        if rows.is_empty() {
            return QuarantineRef::NotNeeded;
        }

        for attempt in 1..=self.max_quarantine_attempts {
            let name = if attempt == 1 {
                source.to_string()
            } else {
                format!("{}-{}", source, attempt)
            };

            match self.quarantine.quarantine_at(rows, &name, report, now) {
                Ok(Some(stored)) => return QuarantineRef::Stored { id: stored.id },
                Ok(None) => return QuarantineRef::NotNeeded,
                Err(QuarantineError::AlreadyExists(id)) => {
                    warn!(
                        event = Event::QuarantineCollision.as_str(),
                        id = %id,
                        attempt,
                        "quarantine name taken"
                    );
                }
                Err(e) => {
                    error!(
                        event = Event::QuarantineUnavailable.as_str(),
                        code = e.code(),
                        error = %e,
                        rows = rows.len(),
                        "invalid rows could not be quarantined"
                    );
                    return QuarantineRef::Unavailable {
                        reason: e.to_string(),
                    };
                }
            }
        }

        error!(
            event = Event::QuarantineUnavailable.as_str(),
            source,
            attempts = self.max_quarantine_attempts,
            "no free quarantine name"
        );
        QuarantineRef::Unavailable {
            reason: format!(
                "no free quarantine name for '{}' after {} attempts",
                source, self.max_quarantine_attempts
            ),
        }
    }
}
