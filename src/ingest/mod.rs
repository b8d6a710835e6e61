//! Ingestion pipeline
//!
//! ```text
//! batch -> classify -> { invalid -> quarantine
//!                      { valid   -> persist_row (one call per row)
//!       -> IngestionOutcome
//! ```
//!
//! Single-threaded and synchronous: each call runs to completion. The only
//! blocking points are the quarantine write and the injected persistence
//! capability.

mod coordinator;
mod outcome;
mod persist;

pub use coordinator::{IngestionCoordinator, DEFAULT_QUARANTINE_ATTEMPTS};
pub use outcome::{IngestionOutcome, OutcomeStatus, QuarantineRef, RowInsertionError};
pub use persist::{PersistError, PersistRow};
