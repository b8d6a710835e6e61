//! Quarantine error types
//!
//! Error codes:
//! - SECMAR_QUARANTINE_EXISTS (REJECT) - name already taken, caller may retry
//! - SECMAR_QUARANTINE_NOT_FOUND (REJECT)
//! - SECMAR_QUARANTINE_CORRUPT (ERROR)
//! - SECMAR_QUARANTINE_UNAVAILABLE (ERROR) - durable medium failed
//! - SECMAR_QUARANTINE_ENCODE (ERROR)

use std::io;

use thiserror::Error;

use crate::errors::Severity;

/// Quarantine store errors
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// An entry with this identifier already exists and is never overwritten
    #[error("quarantine entry '{0}' already exists")]
    AlreadyExists(String),

    /// No entry with this identifier
    #[error("quarantine entry '{0}' not found")]
    NotFound(String),

    /// Stored payload does not parse as a quarantine entry
    #[error("quarantine entry '{id}' is corrupt: {reason}")]
    CorruptEntry { id: String, reason: String },

    /// The durable medium could not be written or read
    #[error("quarantine medium unavailable: {context}: {source}")]
    Unavailable {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The entry could not be serialised
    #[error("failed to encode quarantine entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl QuarantineError {
    /// Wraps a medium failure
    pub fn unavailable(context: impl Into<String>, source: io::Error) -> Self {
        QuarantineError::Unavailable {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QuarantineError::AlreadyExists(_) => "SECMAR_QUARANTINE_EXISTS",
            QuarantineError::NotFound(_) => "SECMAR_QUARANTINE_NOT_FOUND",
            QuarantineError::CorruptEntry { .. } => "SECMAR_QUARANTINE_CORRUPT",
            QuarantineError::Unavailable { .. } => "SECMAR_QUARANTINE_UNAVAILABLE",
            QuarantineError::Encode(_) => "SECMAR_QUARANTINE_ENCODE",
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            QuarantineError::AlreadyExists(_) | QuarantineError::NotFound(_) => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

/// Result type for quarantine operations
pub type QuarantineResult<T> = Result<T, QuarantineError>;
