//! Observable events
//!
//! Every log line emitted by the pipeline carries one of these as its
//! `event` field so operators can filter without parsing messages.

use std::fmt;

/// Observable events in the ingestion pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,
    /// Schema registry built
    SchemasLoaded,

    // Ingestion
    /// A batch was submitted for ingestion
    IngestBegin,
    /// A batch was partitioned into valid and invalid rows
    BatchClassified,
    /// A batch finished ingesting
    IngestComplete,

    // Quarantine
    /// Invalid rows were written to quarantine
    QuarantineWritten,
    /// Nothing to quarantine
    QuarantineSkipped,
    /// Quarantine name already taken, retrying under another
    QuarantineCollision,
    /// Quarantine medium failed; invalid rows were kept in memory only
    QuarantineUnavailable,

    // Persistence
    /// A valid row was inserted
    RowPersisted,
    /// A valid row could not be inserted
    RowPersistFailed,
    /// Record store opened and journal replayed
    StoreOpened,
    /// A mutation was committed to the journal
    StoreCommit,
    /// Journal checksum mismatch (FATAL)
    StoreCorruption,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",

            Event::IngestBegin => "INGEST_BEGIN",
            Event::BatchClassified => "BATCH_CLASSIFIED",
            Event::IngestComplete => "INGEST_COMPLETE",

            Event::QuarantineWritten => "QUARANTINE_WRITTEN",
            Event::QuarantineSkipped => "QUARANTINE_SKIPPED",
            Event::QuarantineCollision => "QUARANTINE_COLLISION",
            Event::QuarantineUnavailable => "QUARANTINE_UNAVAILABLE",

            Event::RowPersisted => "ROW_PERSISTED",
            Event::RowPersistFailed => "ROW_PERSIST_FAILED",
            Event::StoreOpened => "STORE_OPENED",
            Event::StoreCommit => "STORE_COMMIT",
            Event::StoreCorruption => "STORE_CORRUPTION",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreCorruption)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
