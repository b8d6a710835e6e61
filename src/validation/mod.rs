//! Row classification for incoming batches
//!
//! Splits a batch into rows that may enter the system of record and rows that
//! must be quarantined, and explains every rejection in an [`ErrorReport`].
//!
//! Forbidden behaviors:
//! - Raising on bad data (problems are report entries)
//! - Stopping a lazy run at the first failure
//! - Repairing or coercing values
//! - Dropping a row from both subsets

mod classifier;
mod report;

pub use classifier::{check_names, classify, validate_row, ClassifiedRow, ValidationOutcome};
pub use report::{BatchFailure, ErrorReport, FieldFailure, ReportStatus};
