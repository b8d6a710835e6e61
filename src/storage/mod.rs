//! Record storage subsystem
//!
//! The persistence collaborator behind ingestion: a journaled store for the
//! operations, flotteurs and resultats_humain tables.
//!
//! # Durability
//!
//! - Every transaction is one checksummed journal line, fsynced before the
//!   call returns
//! - Data mutations and their audit events share that line
//! - Startup replays the full journal; a checksum failure aborts startup
//!
//! # Layout
//!
//! ```text
//! <data_dir>/
//!   journal.log
//! ```

mod checksum;
mod errors;
mod journal;
mod persister;
mod record_store;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{StorageError, StorageResult};
pub use journal::{Change, Journal, JournalEntry, Mutation, JOURNAL_FILE};
pub use persister::TablePersister;
pub use record_store::RecordStore;
