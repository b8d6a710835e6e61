//! CLI module
//!
//! Provides command-line interface for:
//! - init: Create the store and quarantine directories
//! - validate: Dry-run classification of a file
//! - ingest: Classify, quarantine and store a file
//! - quarantine: Inspect quarantined batches
//! - update / delete: Operator mutations, audited
//! - audit: Print the audit trail
//! - template: Print a table's expected columns

mod args;
mod commands;
mod errors;
mod io;

pub use args::{parse_assignment, parse_json_value, Cli, Command, QuarantineAction};
pub use commands::{
    audit, delete, execute, ingest, init, quarantine, run, template, update, validate,
};
pub use errors::{CliError, CliResult};
pub use io::{error_envelope, ok_envelope, write_error, write_response};
