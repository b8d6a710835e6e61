//! Quarantine entry, the on-disk record of one rejected batch
//!
//! The JSON shape is a durable contract read by operator tooling:
//!
//! ```json
//! {
//!   "timestamp": "2024-08-03T14:05:09.000000Z",
//!   "source": "operations_upload",
//!   "total_invalid_rows": 1,
//!   "validation_report": { "status": "failed", ... },
//!   "invalid_data": [ { "operation_id": 2, ... } ]
//! }
//! ```

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::batch::Row;
use crate::validation::ErrorReport;

/// One quarantined batch. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// ISO-8601 creation time
    pub timestamp: String,
    /// Free text describing where the batch came from
    pub source: String,
    /// Number of rows in `invalid_data`
    pub total_invalid_rows: usize,
    /// Why the rows were rejected. Failure `row` fields are positions in the
    /// submitted batch; `invalid_row_indices[i]` is the position of
    /// `invalid_data[i]`.
    pub validation_report: ErrorReport,
    /// The rejected rows as captured at validation time, in batch order
    pub invalid_data: Vec<Row>,
}

impl QuarantineEntry {
    /// Parses `timestamp`, if it carries an offset
    pub fn recorded_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_on_disk_shape() {
        let entry = QuarantineEntry {
            timestamp: "2024-08-03T14:05:09Z".into(),
            source: "upload".into(),
            total_invalid_rows: 0,
            validation_report: ErrorReport::success(),
            invalid_data: vec![],
        };
        let value = serde_json::to_value(&entry).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "timestamp",
                "source",
                "total_invalid_rows",
                "validation_report",
                "invalid_data"
            ]
        );
        assert!(entry.recorded_at().is_some());
    }

    #[test]
    fn test_parses_written_shape() {
        let raw = json!({
            "timestamp": "2024-08-03T14:05:09.123456Z",
            "source": "bulk_2024",
            "total_invalid_rows": 1,
            "validation_report": {
                "status": "failed",
                "total_errors": 1,
                "field_errors": [{
                    "row": 4,
                    "field": "mer_force",
                    "check": "in_range",
                    "message": "11 is not in [0, 9] or -1"
                }],
                "batch_errors": []
            },
            "invalid_data": [{"operation_id": 9, "mer_force": 11}]
        });
        let entry: QuarantineEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.total_invalid_rows, 1);
        assert_eq!(entry.validation_report.field_errors[0].row, 4);
        assert_eq!(entry.invalid_data[0]["mer_force"], json!(11));
    }
}
