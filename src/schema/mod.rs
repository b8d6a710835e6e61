//! Schema registry for SEC MAR tables
//!
//! Schemas are declarative, immutable after construction and bound to a
//! table kind. They are the only source of validation rules.
//!
//! # Design Principles
//!
//! - Built once at startup; a malformed schema is fatal
//! - No runtime editing of rules
//! - Checks run only on non-null values of the right type
//! - Sentinel values are declared per check, never globally

mod checks;
mod errors;
mod registry;
mod types;

pub use checks::Check;
pub use errors::{SchemaError, SchemaResult};
pub use registry::{SchemaRegistry, OPERATION_TYPES, UNKNOWN_SENTINEL};
pub use types::{json_type_name, FieldSpec, FieldType, SchemaBuilder, TableKind, TableSchema};
