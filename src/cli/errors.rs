//! CLI error types
//!
//! Wraps every subsystem error so the command layer can report one stable
//! code per failure. Subsystem codes pass through unchanged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::batch::InputError;
use crate::config::ConfigError;
use crate::errors::Severity;
use crate::quarantine::QuarantineError;
use crate::schema::SchemaError;
use crate::storage::StorageError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("data directory {} already initialized", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("data directory {} not initialized; run 'secmar init' first", .0.display())]
    NotInitialized(PathBuf),

    #[error("cannot open {}: {source}", .path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.code(),
            CliError::Schema(e) => e.code(),
            CliError::Input(e) => e.code(),
            CliError::Quarantine(e) => e.code(),
            CliError::Storage(e) => e.code(),
            CliError::AlreadyInitialized(_) => "SECMAR_CLI_ALREADY_INITIALIZED",
            CliError::NotInitialized(_) => "SECMAR_CLI_NOT_INITIALIZED",
            CliError::OpenInput { .. } => "SECMAR_CLI_INPUT_UNREADABLE",
            CliError::Io(_) | CliError::Json(_) => "SECMAR_CLI_IO_ERROR",
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> Severity {
        match self {
            CliError::Config(e) => e.severity(),
            CliError::Schema(e) => e.severity(),
            CliError::Input(e) => e.severity(),
            CliError::Quarantine(e) => e.severity(),
            CliError::Storage(e) => e.severity(),
            CliError::AlreadyInitialized(_) | CliError::NotInitialized(_) => Severity::Fatal,
            CliError::OpenInput { .. } => Severity::Reject,
            CliError::Io(_) | CliError::Json(_) => Severity::Error,
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
