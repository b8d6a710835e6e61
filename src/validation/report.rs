//! Structured validation report
//!
//! The report is a value returned by the classifier, never an error. Its
//! JSON shape is part of the quarantine file format and must stay readable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Overall validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Failed,
}

/// A check that failed on one field of one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Index of the row in the submitted batch
    pub row: usize,
    /// Column name
    pub field: String,
    /// Name of the failing check
    pub check: String,
    /// Human-readable explanation
    pub message: String,
}

/// A cross-row check that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Name of the failing check
    pub check: String,
    /// Columns involved
    pub columns: Vec<String>,
    /// Every row implicated, in batch order
    pub rows: Vec<usize>,
    /// Human-readable explanation
    pub message: String,
}

/// Outcome of validating one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub status: ReportStatus,
    pub total_errors: usize,
    pub field_errors: Vec<FieldFailure>,
    pub batch_errors: Vec<BatchFailure>,
    /// Batch positions of every implicated row, ascending. Row indices in
    /// the failures refer to these positions, not to a row's place among
    /// the invalid rows alone.
    #[serde(default)]
    pub invalid_row_indices: Vec<usize>,
}

impl ErrorReport {
    /// Builds a report; status and total are derived from the lists
    pub fn new(field_errors: Vec<FieldFailure>, batch_errors: Vec<BatchFailure>) -> Self {
        let total_errors = field_errors.len() + batch_errors.len();
        let invalid_row_indices: BTreeSet<usize> = field_errors
            .iter()
            .map(|e| e.row)
            .chain(batch_errors.iter().flat_map(|e| e.rows.iter().copied()))
            .collect();
        let status = if total_errors == 0 {
            ReportStatus::Success
        } else {
            ReportStatus::Failed
        };
        Self {
            status,
            total_errors,
            field_errors,
            batch_errors,
            invalid_row_indices: invalid_row_indices.into_iter().collect(),
        }
    }

    /// A report with no errors
    pub fn success() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Whether no check failed
    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }

    /// Field failures recorded against one row
    pub fn errors_for_row(&self, row: usize) -> impl Iterator<Item = &FieldFailure> {
        self.field_errors.iter().filter(move |e| e.row == row)
    }
}

impl Default for ErrorReport {
    fn default() -> Self {
        Self::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(row: usize) -> FieldFailure {
        FieldFailure {
            row,
            field: "vent_force".into(),
            check: "in_range".into(),
            message: "15 is not in [0, 12] or -1".into(),
        }
    }

    #[test]
    fn test_total_is_sum_of_lists() {
        let report = ErrorReport::new(
            vec![failure(0), failure(3)],
            vec![BatchFailure {
                check: "unique".into(),
                columns: vec!["operation_id".into()],
                rows: vec![1, 2],
                message: "duplicate".into(),
            }],
        );
        assert_eq!(report.total_errors, 3);
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.invalid_row_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = ErrorReport::success();
        assert!(report.is_success());
        assert_eq!(report.total_errors, 0);
    }

    #[test]
    fn test_status_serialises_lowercase() {
        let json = serde_json::to_value(ErrorReport::success()).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["total_errors"], 0);
    }

    #[test]
    fn test_errors_for_row() {
        let report = ErrorReport::new(vec![failure(0), failure(2), failure(2)], vec![]);
        assert_eq!(report.errors_for_row(2).count(), 2);
        assert_eq!(report.errors_for_row(1).count(), 0);
    }
}
