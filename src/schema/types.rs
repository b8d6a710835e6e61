//! Schema type definitions
//!
//! Supported logical types:
//! - integer: 64-bit signed integer
//! - float: 64-bit floating point (integers are accepted)
//! - text: UTF-8 string
//! - boolean: true / false
//! - timestamp: RFC 3339 or `YYYY-MM-DD HH:MM:SS` text

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checks::Check;
use super::errors::{SchemaError, SchemaResult};
use crate::batch::Row;

/// Naive timestamp layouts accepted alongside RFC 3339
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Logical field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
        }
    }

    /// Returns whether a non-null value has this logical type.
    ///
    /// No coercion: `"3"` is not an integer and `3.0` is not an integer.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.as_f64().map_or(false, f64::is_finite),
            FieldType::Text => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Timestamp => value.as_str().map_or(false, is_timestamp),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn is_timestamp(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || TIMESTAMP_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
}

/// Returns the JSON type name of a value for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "float"
            }
        }
        Value::String(_) => "text",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Specification of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Column name
    pub name: String,
    /// Logical type
    pub field_type: FieldType,
    /// Whether null is an acceptable value
    pub nullable: bool,
    /// Whether the column must appear in the batch
    pub required: bool,
    /// Whether values must be unique within a batch
    pub unique: bool,
    /// Semantic checks, evaluated on non-null values only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Check>,
}

impl FieldSpec {
    /// Creates a required, non-null field with no checks
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            required: true,
            unique: false,
            checks: Vec::new(),
        }
    }

    /// Shorthand for a nullable column that must still be present
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type).allow_null()
    }

    /// Shorthand for a nullable column that may be absent
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type).allow_null().not_required()
    }

    /// Allows null values
    pub fn allow_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Allows the column to be absent
    pub fn not_required(mut self) -> Self {
        self.required = false;
        self
    }

    /// Requires values to be unique within a batch
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds a semantic check
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }
}

/// The table kinds known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Rescue operations
    Operations,
    /// Floats / craft involved in an operation
    Flotteurs,
    /// Human outcomes of an operation
    ResultatsHumain,
}

impl TableKind {
    /// All table kinds, parents first
    pub const ALL: [TableKind; 3] = [
        TableKind::Operations,
        TableKind::Flotteurs,
        TableKind::ResultatsHumain,
    ];

    /// Returns the table name
    pub fn table_name(&self) -> &'static str {
        match self {
            TableKind::Operations => "operations",
            TableKind::Flotteurs => "flotteurs",
            TableKind::ResultatsHumain => "resultats_humain",
        }
    }

    /// Column identifying a row, if the table has a natural primary key
    pub fn primary_key(&self) -> Option<&'static str> {
        match self {
            TableKind::Operations => Some("operation_id"),
            TableKind::Flotteurs | TableKind::ResultatsHumain => None,
        }
    }

    /// Table referenced through `operation_id`, if any
    pub fn parent(&self) -> Option<TableKind> {
        match self {
            TableKind::Operations => None,
            TableKind::Flotteurs | TableKind::ResultatsHumain => Some(TableKind::Operations),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

impl FromStr for TableKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableKind::ALL
            .into_iter()
            .find(|kind| kind.table_name() == s)
            .ok_or_else(|| SchemaError::UnknownTable(s.to_string()))
    }
}

/// Immutable description of one table.
///
/// Only obtainable through [`TableSchema::builder`], which rejects malformed
/// definitions, so every `TableSchema` in the process is structurally sound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    kind: TableKind,
    strict: bool,
    fields: Vec<FieldSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unique_together: Vec<Vec<String>>,
}

impl TableSchema {
    /// Starts building a schema for `kind`
    pub fn builder(kind: TableKind) -> SchemaBuilder {
        SchemaBuilder {
            kind,
            strict: false,
            fields: Vec::new(),
            unique_together: Vec::new(),
        }
    }

    /// Table kind
    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Whether undeclared columns are rejected
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Declared fields in order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared field
    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Composite unique keys
    pub fn unique_together(&self) -> &[Vec<String>] {
        &self.unique_together
    }

    /// A row holding every declared column, all null, in declaration order
    pub fn template_row(&self) -> Row {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), Value::Null))
            .collect()
    }
}

/// Builder for [`TableSchema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    kind: TableKind,
    strict: bool,
    fields: Vec<FieldSpec>,
    unique_together: Vec<Vec<String>>,
}

impl SchemaBuilder {
    /// Rejects columns that are not declared
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Appends a field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a composite unique key
    pub fn unique_together(mut self, columns: &[&str]) -> Self {
        self.unique_together
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Validates the definition and freezes it
    pub fn build(self) -> SchemaResult<TableSchema> {
        let table = self.kind.table_name();
        let mut seen = HashSet::new();

        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    table: table.to_string(),
                    field: field.name.clone(),
                });
            }
            if field.unique && field.nullable {
                return Err(SchemaError::UniqueNullable {
                    table: table.to_string(),
                    field: field.name.clone(),
                });
            }
            if let Some(reason) = field.checks.iter().find_map(Check::structural_problem) {
                return Err(SchemaError::InvalidCheck {
                    table: table.to_string(),
                    field: field.name.clone(),
                    reason,
                });
            }
        }

        for key in &self.unique_together {
            if let Some(missing) = key.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(SchemaError::UnknownKeyField {
                    table: table.to_string(),
                    field: missing.clone(),
                });
            }
        }

        Ok(TableSchema {
            kind: self.kind,
            strict: self.strict,
            fields: self.fields,
            unique_together: self.unique_together,
        })
    }
}
