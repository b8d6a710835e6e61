//! secmar - validation and quarantine pipeline for SEC MAR rescue records
//!
//! Incoming batches of operations, flotteurs and resultats_humain rows are
//! classified against strict table schemas. Invalid rows go to a write-once
//! quarantine with a report explaining every failure; valid rows go to an
//! audited, journaled record store. No row is silently dropped and no row
//! is silently accepted.

pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod observability;
pub mod quarantine;
pub mod schema;
pub mod storage;
pub mod validation;
