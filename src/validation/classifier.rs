//! Row classifier
//!
//! Partitions a batch into valid and invalid rows against one table schema.
//!
//! Validation semantics:
//! - Every required column appears in the batch
//! - No null or absent value in a non-nullable column
//!   (an absent nullable column in one row reads as null)
//! - Value types match the logical type exactly (no coercion)
//! - Every check on a non-null value passes
//! - Unique columns and composite keys hold within the batch
//! - Strict schemas reject undeclared columns
//!
//! The classifier is a pure function of its inputs. It never fails: every
//! problem found in the data is a value in the returned report.

use std::collections::HashMap;

use serde_json::Value;

use super::report::{BatchFailure, ErrorReport, FieldFailure};
use crate::batch::{Batch, Row};
use crate::schema::{json_type_name, FieldSpec, TableSchema};

/// Check names used for structural failures
pub mod check_names {
    pub const REQUIRED: &str = "required";
    pub const COLUMN_PRESENT: &str = "column_present";
    pub const NOT_NULLABLE: &str = "not_nullable";
    pub const DTYPE: &str = "dtype";
    pub const UNDECLARED_FIELD: &str = "undeclared_field";
    pub const UNIQUE: &str = "unique";
    pub const UNIQUE_TOGETHER: &str = "unique_together";
}

/// A row together with its position in the submitted batch
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    /// Index in the original batch
    pub index: usize,
    /// The row as submitted
    pub row: Row,
}

/// Result of classifying one batch.
///
/// `valid` and `invalid` partition the batch and each keeps batch order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: Vec<ClassifiedRow>,
    pub invalid: Vec<ClassifiedRow>,
    pub report: ErrorReport,
}

impl ValidationOutcome {
    /// Number of rows in the classified batch
    pub fn total_rows(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    /// Whether every row passed
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }

    /// Batch indices of the valid rows
    pub fn valid_indices(&self) -> Vec<usize> {
        self.valid.iter().map(|r| r.index).collect()
    }

    /// Batch indices of the invalid rows
    pub fn invalid_indices(&self) -> Vec<usize> {
        self.invalid.iter().map(|r| r.index).collect()
    }

    /// Copies of the invalid rows, as submitted
    pub fn invalid_rows(&self) -> Vec<Row> {
        self.invalid.iter().map(|r| r.row.clone()).collect()
    }
}

/// Classifies a batch against a schema.
///
/// With `lazy` set every check runs on every row, so the report lists every
/// problem in one pass. Without it, each row stops at its first failure;
/// every row and every cross-row check is still evaluated, so the partition
/// is identical in both modes.
pub fn classify(batch: Batch, schema: &TableSchema, lazy: bool) -> ValidationOutcome {
    let mut field_errors = Vec::new();
    for (index, row) in batch.rows().iter().enumerate() {
        check_row(index, row, schema, lazy, &mut field_errors);
    }
    let mut batch_errors = Vec::new();
    batch_errors.extend(check_columns_present(batch.rows(), schema));
    batch_errors.extend(check_uniqueness(batch.rows(), schema));

    let mut implicated = vec![false; batch.len()];
    for failure in &field_errors {
        implicated[failure.row] = true;
    }
    for failure in &batch_errors {
        for &row in &failure.rows {
            implicated[row] = true;
        }
    }

    let (invalid, valid): (Vec<_>, Vec<_>) = batch
        .into_rows()
        .into_iter()
        .enumerate()
        .map(|(index, row)| ClassifiedRow { index, row })
        .partition(|r| implicated[r.index]);

    ValidationOutcome {
        valid,
        invalid,
        report: ErrorReport::new(field_errors, batch_errors),
    }
}

/// Checks one row on its own, outside any batch.
///
/// Runs the per-row checks only: column presence and uniqueness belong to
/// a batch and are not evaluated. A nullable column the row omits reads as
/// null. Failures are reported at row index 0.
pub fn validate_row(row: &Row, schema: &TableSchema, lazy: bool) -> ErrorReport {
    let mut field_errors = Vec::new();
    check_row(0, row, schema, lazy, &mut field_errors);
    ErrorReport::new(field_errors, Vec::new())
}

fn check_row(index: usize, row: &Row, schema: &TableSchema, lazy: bool, errors: &mut Vec<FieldFailure>) {
    let start = errors.len();

    for spec in schema.fields() {
        check_field(index, row.get(&spec.name), spec, lazy, errors);
        if !lazy && errors.len() > start {
            return;
        }
    }

    if schema.is_strict() {
        for key in row.keys().filter(|k| !schema.declares(k)) {
            errors.push(failure(
                index,
                key,
                check_names::UNDECLARED_FIELD,
                format!("column '{}' is not declared in table '{}'", key, schema.kind()),
            ));
            if !lazy {
                return;
            }
        }
    }
}

fn check_field(index: usize, value: Option<&Value>, spec: &FieldSpec, lazy: bool, errors: &mut Vec<FieldFailure>) {
    match value {
        None => {
            if spec.required && !spec.nullable {
                errors.push(failure(
                    index,
                    &spec.name,
                    check_names::REQUIRED,
                    "required column is missing".to_string(),
                ));
            }
        }
        Some(Value::Null) => {
            if !spec.nullable {
                errors.push(failure(
                    index,
                    &spec.name,
                    check_names::NOT_NULLABLE,
                    "null value in non-nullable column".to_string(),
                ));
            }
        }
        Some(value) if !spec.field_type.accepts(value) => {
            errors.push(failure(
                index,
                &spec.name,
                check_names::DTYPE,
                format!(
                    "expected {}, got {} {}",
                    spec.field_type,
                    json_type_name(value),
                    value
                ),
            ));
        }
        Some(value) => {
            for check in &spec.checks {
                if let Err(message) = check.evaluate(value) {
                    errors.push(failure(index, &spec.name, check.name(), message));
                    if !lazy {
                        return;
                    }
                }
            }
        }
    }
}

fn failure(row: usize, field: &str, check: &str, message: String) -> FieldFailure {
    FieldFailure {
        row,
        field: field.to_string(),
        check: check.to_string(),
        message,
    }
}

/// Required nullable columns must appear in at least one row; a column the
/// whole batch lacks implicates every row.
fn check_columns_present(rows: &[Row], schema: &TableSchema) -> Option<BatchFailure> {
    if rows.is_empty() {
        return None;
    }
    let missing: Vec<String> = schema
        .fields()
        .iter()
        .filter(|f| f.required && f.nullable)
        .filter(|f| !rows.iter().any(|row| row.contains_key(&f.name)))
        .map(|f| f.name.clone())
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(BatchFailure {
        check: check_names::COLUMN_PRESENT.to_string(),
        message: format!("required columns missing from batch: {}", missing.join(", ")),
        columns: missing,
        rows: (0..rows.len()).collect(),
    })
}

fn check_uniqueness(rows: &[Row], schema: &TableSchema) -> Vec<BatchFailure> {
    let singles = schema
        .fields()
        .iter()
        .filter(|f| f.unique)
        .map(|f| (check_names::UNIQUE, vec![f.name.clone()]));
    let composites = schema
        .unique_together()
        .iter()
        .map(|key| (check_names::UNIQUE_TOGETHER, key.clone()));

    singles
        .chain(composites)
        .flat_map(|(check, columns)| duplicate_groups(rows, &columns, check))
        .collect()
}

/// Groups rows sharing a key; rows with a null or missing key column are
/// not compared. Groups are reported in order of first occurrence.
fn duplicate_groups(rows: &[Row], columns: &[String], check: &str) -> Vec<BatchFailure> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let parts: Option<Vec<String>> = columns
            .iter()
            .map(|c| row.get(c).filter(|v| !v.is_null()).map(Value::to_string))
            .collect();
        let Some(parts) = parts else {
            continue;
        };
        let key = format!("({})", parts.join(", "));
        let entry = groups.entry(key.clone()).or_default();
        if entry.is_empty() {
            first_seen.push(key);
        }
        entry.push(index);
    }

    first_seen
        .into_iter()
        .filter_map(|key| {
            let rows = groups.remove(&key)?;
            (rows.len() > 1).then(|| BatchFailure {
                check: check.to_string(),
                columns: columns.to_vec(),
                message: format!(
                    "({}) = {} appears in rows {:?}",
                    columns.join(", "),
                    key,
                    rows
                ),
                rows,
            })
        })
        .collect()
}
