//! Schema configuration errors
//!
//! Error codes:
//! - SECMAR_SCHEMA_DUPLICATE_FIELD (FATAL)
//! - SECMAR_SCHEMA_UNIQUE_NULLABLE (FATAL)
//! - SECMAR_SCHEMA_UNKNOWN_KEY_FIELD (FATAL)
//! - SECMAR_SCHEMA_INVALID_CHECK (FATAL)
//! - SECMAR_UNKNOWN_TABLE (FATAL)
//!
//! A malformed schema is never a runtime validation failure: the process
//! must refuse to ingest anything until the schema is fixed.

use thiserror::Error;

use crate::errors::Severity;

/// Schema construction and lookup errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The same field name is declared twice in one table
    #[error("table '{table}' declares field '{field}' more than once")]
    DuplicateField { table: String, field: String },

    /// A uniqueness requirement was placed on a nullable field
    #[error("table '{table}' field '{field}' is unique but nullable")]
    UniqueNullable { table: String, field: String },

    /// A composite unique key names a field that is not declared
    #[error("table '{table}' unique key references undeclared field '{field}'")]
    UnknownKeyField { table: String, field: String },

    /// A semantic check cannot ever be satisfied as written
    #[error("table '{table}' field '{field}' has an invalid check: {reason}")]
    InvalidCheck {
        table: String,
        field: String,
        reason: String,
    },

    /// No schema is registered under this table name
    #[error("unknown table '{0}'")]
    UnknownTable(String),
}

impl SchemaError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateField { .. } => "SECMAR_SCHEMA_DUPLICATE_FIELD",
            SchemaError::UniqueNullable { .. } => "SECMAR_SCHEMA_UNIQUE_NULLABLE",
            SchemaError::UnknownKeyField { .. } => "SECMAR_SCHEMA_UNKNOWN_KEY_FIELD",
            SchemaError::InvalidCheck { .. } => "SECMAR_SCHEMA_INVALID_CHECK",
            SchemaError::UnknownTable(_) => "SECMAR_UNKNOWN_TABLE",
        }
    }

    /// Schema errors are configuration errors and always fatal
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
