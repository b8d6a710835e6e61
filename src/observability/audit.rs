//! Audit trail for record mutations
//!
//! Every insert, update and delete committed by the record store produces
//! one `AuditEvent` naming the actor and each field that changed. Events are
//! journaled in the same line as the mutation they describe, so the trail
//! can never disagree with the data.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::batch::Row;
use crate::schema::TableKind;

/// Audit action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// Row created.
    Insert,

    /// Fields of an existing row changed.
    Update,

    /// Row removed, directly or by cascade.
    Delete,
}

impl AuditAction {
    /// Returns the action name string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One field transition. `old` is null on insert, `new` is null on delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique record ID.
    pub id: Uuid,

    /// When the mutation was committed.
    pub timestamp: DateTime<Utc>,

    /// Table the row lives in.
    pub table: TableKind,

    /// What happened.
    pub action: AuditAction,

    /// `operation_id` for operations, the internal row id otherwise.
    pub record_id: Value,

    /// Who did it: an operator name, or `system_<source>` for ingestion.
    pub actor: String,

    /// Fields that changed, in column order.
    pub changes: Vec<FieldChange>,
}

impl AuditEvent {
    /// Create a new audit event with no field changes.
    pub fn new(
        table: TableKind,
        action: AuditAction,
        record_id: Value,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            table,
            action,
            record_id,
            actor: actor.into(),
            changes: Vec::new(),
        }
    }

    /// Set the field changes.
    pub fn with_changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changes = changes;
        self
    }

    /// Whether `field` is among the changes.
    pub fn touches(&self, field: &str) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }
}

/// Field-by-field difference between two versions of a row.
///
/// Columns present in either row are compared; a missing column reads as
/// null. Unchanged columns are omitted. Order follows `before`, then any
/// columns only `after` has.
pub fn diff_rows(before: &Row, after: &Row) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for (field, old) in before {
        let new = after.get(field).unwrap_or(&Value::Null);
        if old != new {
            changes.push(FieldChange {
                field: field.clone(),
                old: old.clone(),
                new: new.clone(),
            });
        }
    }
    for (field, new) in after {
        if !before.contains_key(field) && !new.is_null() {
            changes.push(FieldChange {
                field: field.clone(),
                old: Value::Null,
                new: new.clone(),
            });
        }
    }

    changes
}
