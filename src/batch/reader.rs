//! Batch readers for uploaded files
//!
//! CSV cells arrive as text. Each cell is typed by the declared logical type
//! of its column: empty cells become null, parseable numbers and booleans
//! become JSON scalars, and anything else stays text so the classifier
//! reports the mismatch. Nothing is repaired.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde_json::{Number, Value};

use super::errors::{InputError, InputResult};
use super::{Batch, Row};
use crate::schema::{json_type_name, FieldType, TableSchema};

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of objects, or one object per line
    Json,
}

impl InputFormat {
    /// Guesses the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Json,
        }
    }

    /// Reads a batch in this format
    pub fn read<R: Read>(&self, reader: R, schema: &TableSchema) -> InputResult<Batch> {
        match self {
            InputFormat::Csv => read_csv(reader, schema),
            InputFormat::Json => read_json(reader),
        }
    }
}

impl FromStr for InputFormat {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" | "jsonl" => Ok(InputFormat::Json),
            other => Err(InputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Reads a CSV batch, typing cells by the schema's declared column types.
pub fn read_csv<R: Read>(reader: R, schema: &TableSchema) -> InputResult<Batch> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut seen = HashSet::new();
    if let Some(repeated) = headers.iter().find(|h| !seen.insert(*h)) {
        return Err(InputError::DuplicateColumn(repeated.to_string()));
    }
    let types: Vec<Option<FieldType>> = headers
        .iter()
        .map(|h| schema.field(h).map(|f| f.field_type))
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .zip(types.iter())
            .map(|((name, cell), ty)| (name.to_string(), type_cell(cell, *ty)))
            .collect();
        rows.push(row);
    }

    Ok(Batch::new(rows))
}

/// Reads a JSON batch: either one array of objects or JSON lines.
pub fn read_json<R: Read>(mut reader: R) -> InputResult<Batch> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let values: Vec<Value> = if content.trim_start().starts_with('[') {
        serde_json::from_str(&content).map_err(|source| InputError::Json { record: 0, source })?
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|source| InputError::Json { record: i, source })
            })
            .collect::<InputResult<_>>()?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(record, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(InputError::NotAnObject {
                record,
                found: json_type_name(&other),
            }),
        })
        .collect::<InputResult<Vec<Row>>>()
        .map(Batch::new)
}

fn type_cell(cell: &str, field_type: Option<FieldType>) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let typed = match field_type {
        Some(FieldType::Integer) => trimmed.parse::<i64>().ok().map(Value::from),
        Some(FieldType::Float) => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some(FieldType::Boolean) => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Some(FieldType::Text) | Some(FieldType::Timestamp) | None => None,
    };

    typed.unwrap_or_else(|| Value::String(cell.to_string()))
}
