//! Shared error severity levels
//!
//! Every subsystem error exposes a stable `SECMAR_*` code and one of these
//! severities so callers can tell a rejected input apart from a broken
//! installation without matching on variants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity levels shared by all subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// The request was rejected; the process continues
    Reject,
    /// An operational failure; the current call fails, the process continues
    Error,
    /// Configuration is broken; the process must not start
    Fatal,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Reject => "REJECT",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
