//! Quarantine subsystem
//!
//! Invalid rows are never dropped silently. Each batch that produces invalid
//! rows yields one write-once entry holding the rows and the validation
//! report that explains them.

mod entry;
mod errors;
mod medium;
mod store;

pub use entry::QuarantineEntry;
pub use errors::{QuarantineError, QuarantineResult};
pub use medium::{FsMedium, MemoryMedium, QuarantineMedium};
pub use store::{entry_id, QuarantineStore, StoredEntry, ENTRY_PREFIX, ENTRY_SUFFIX};
