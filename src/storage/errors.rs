//! Storage error types
//!
//! Error codes:
//! - SECMAR_STORAGE_WRITE_FAILED (ERROR)
//! - SECMAR_STORAGE_READ_FAILED (ERROR)
//! - SECMAR_STORAGE_ENCODE (ERROR)
//! - SECMAR_DATA_CORRUPTION (FATAL) - journal checksum or framing failure
//! - SECMAR_ROW_INVALID (REJECT)
//! - SECMAR_DUPLICATE_KEY (REJECT)
//! - SECMAR_MISSING_PARENT (REJECT)
//! - SECMAR_RECORD_NOT_FOUND (REJECT)
//! - SECMAR_UNKNOWN_FIELD (REJECT)
//! - SECMAR_IMMUTABLE_KEY (REJECT)

use std::io;

use serde_json::Value;
use thiserror::Error;

use crate::errors::Severity;
use crate::schema::TableKind;
use crate::validation::ErrorReport;

/// Record store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("write failed: {context}: {source}")]
    WriteFailed {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {context}: {source}")]
    ReadFailed {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode journal entry: {0}")]
    Encode(#[from] serde_json::Error),

    /// The journal cannot be trusted; the store must not open
    #[error("journal corrupt at line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    /// The row does not satisfy its table schema
    #[error("{table} row failed validation: {summary}")]
    Invalid {
        table: TableKind,
        summary: String,
        report: ErrorReport,
    },

    #[error("duplicate key in {table}: ({}) = {value}", .columns.join(", "))]
    DuplicateKey {
        table: TableKind,
        columns: Vec<String>,
        value: String,
    },

    #[error("{table} row references missing operation {operation_id}")]
    MissingParent {
        table: TableKind,
        operation_id: Value,
    },

    #[error("no {table} row with key {key}")]
    NotFound { table: TableKind, key: Value },

    #[error("field '{field}' is not declared for {table}")]
    UnknownField { table: TableKind, field: String },

    #[error("primary key '{field}' of {table} cannot be changed")]
    ImmutableKey { table: TableKind, field: String },
}

impl StorageError {
    pub fn write_failed(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::WriteFailed {
            context: context.into(),
            source,
        }
    }

    pub fn read_failed(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::ReadFailed {
            context: context.into(),
            source,
        }
    }

    pub fn corruption(line: usize, reason: impl Into<String>) -> Self {
        StorageError::Corruption {
            line,
            reason: reason.into(),
        }
    }

    /// Wraps a failed validation report, summarising its first failure
    pub fn invalid(table: TableKind, report: ErrorReport) -> Self {
        let summary = report
            .field_errors
            .first()
            .map(|e| format!("{}: {}", e.field, e.message))
            .or_else(|| report.batch_errors.first().map(|e| e.message.clone()))
            .unwrap_or_else(|| "validation failed".to_string());
        StorageError::Invalid {
            table,
            summary,
            report,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::WriteFailed { .. } => "SECMAR_STORAGE_WRITE_FAILED",
            StorageError::ReadFailed { .. } => "SECMAR_STORAGE_READ_FAILED",
            StorageError::Encode(_) => "SECMAR_STORAGE_ENCODE",
            StorageError::Corruption { .. } => "SECMAR_DATA_CORRUPTION",
            StorageError::Invalid { .. } => "SECMAR_ROW_INVALID",
            StorageError::DuplicateKey { .. } => "SECMAR_DUPLICATE_KEY",
            StorageError::MissingParent { .. } => "SECMAR_MISSING_PARENT",
            StorageError::NotFound { .. } => "SECMAR_RECORD_NOT_FOUND",
            StorageError::UnknownField { .. } => "SECMAR_UNKNOWN_FIELD",
            StorageError::ImmutableKey { .. } => "SECMAR_IMMUTABLE_KEY",
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            StorageError::Corruption { .. } => Severity::Fatal,
            StorageError::WriteFailed { .. }
            | StorageError::ReadFailed { .. }
            | StorageError::Encode(_) => Severity::Error,
            _ => Severity::Reject,
        }
    }

    /// Whether the store refused the request without touching the journal
    pub fn is_rejection(&self) -> bool {
        self.severity() == Severity::Reject
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
