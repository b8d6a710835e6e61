//! Observability subsystem
//!
//! - Typed lifecycle events carried on every log line
//! - Subscriber setup for text or JSON logs
//! - Audit events for every committed record mutation
//!
//! Observability is read-only: nothing here changes what the pipeline does.
//!
//! # Usage
//!
//! ```ignore
//! use secmar::observability::{init_logging, Event, LogFormat};
//!
//! init_logging(LogFormat::Json, "info");
//! tracing::info!(event = Event::IngestBegin.as_str(), rows = 42);
//! ```

pub mod audit;
mod events;
mod logging;

pub use audit::{diff_rows, AuditAction, AuditEvent, FieldChange};
pub use events::Event;
pub use logging::{env_filter, init_logging, LogFormat};
