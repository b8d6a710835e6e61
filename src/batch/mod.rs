//! Batches of rows submitted for validation
//!
//! A row is an ordered mapping from column name to scalar value. Column
//! order is kept as read so quarantined rows serialise exactly as received.

mod errors;
mod reader;

pub use errors::{InputError, InputResult};
pub use reader::{read_csv, read_json, InputFormat};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record: column name to scalar value, in input order
pub type Row = Map<String, Value>;

/// An ordered sequence of rows submitted together.
///
/// A batch is consumed by the classifier; only row-level outcomes persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    rows: Vec<Row>,
}

impl Batch {
    /// Creates a batch from rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in submission order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the batch, returning its rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl From<Vec<Row>> for Batch {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl FromIterator<Row> for Batch {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Converts a `json!({...})` literal into a row.
///
/// Returns `None` if the value is not an object.
pub fn row_from_value(value: Value) -> Option<Row> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
