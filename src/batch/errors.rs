//! Batch input errors
//!
//! Raised before classification when the input is not structurally a batch
//! of mappings. Content problems inside well-formed rows are never input
//! errors; they belong in the validation report.

use thiserror::Error;

use crate::errors::Severity;

/// Errors reading a batch from CSV or JSON
#[derive(Debug, Error)]
pub enum InputError {
    /// CSV could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON could not be parsed
    #[error("JSON error at record {record}: {source}")]
    Json {
        record: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A CSV header names the same column twice
    #[error("CSV header repeats column '{0}'")]
    DuplicateColumn(String),

    /// A JSON record is not an object
    #[error("record {record} is a {found}, expected an object")]
    NotAnObject { record: usize, found: &'static str },

    /// The input stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported input format name
    #[error("unknown input format '{0}', expected csv or json")]
    UnknownFormat(String),
}

impl InputError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            InputError::Csv(_) => "SECMAR_INPUT_CSV",
            InputError::Json { .. } => "SECMAR_INPUT_JSON",
            InputError::DuplicateColumn(_) => "SECMAR_INPUT_DUPLICATE_COLUMN",
            InputError::NotAnObject { .. } => "SECMAR_INPUT_NOT_AN_OBJECT",
            InputError::Io(_) => "SECMAR_INPUT_IO",
            InputError::UnknownFormat(_) => "SECMAR_INPUT_UNKNOWN_FORMAT",
        }
    }

    /// Input errors reject the submission
    pub fn severity(&self) -> Severity {
        match self {
            InputError::Io(_) => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

/// Result type for batch input
pub type InputResult<T> = Result<T, InputError>;
