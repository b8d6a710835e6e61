//! Record store
//!
//! The system of record for the three tables. State lives in memory and is
//! rebuilt from the journal on open; every mutation is journaled (with its
//! audit events) and fsynced before it is applied in memory, so a failed
//! write leaves the store unchanged.
//!
//! Constraints enforced on every write:
//! - the row satisfies its table schema
//! - unique columns and composite keys hold against stored rows
//! - child rows reference an existing operation
//!
//! Deleting an operation removes its flotteurs and resultats_humain rows in
//! the same transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::errors::{StorageError, StorageResult};
use super::journal::{Change, Journal, JournalEntry, Mutation};
use crate::batch::Row;
use crate::observability::{diff_rows, AuditAction, AuditEvent, Event};
use crate::schema::{SchemaRegistry, TableKind, TableSchema};
use crate::validation::validate_row;

/// Column linking child tables to their operation
const PARENT_KEY: &str = "operation_id";

/// Durable store for operations and their child rows.
pub struct RecordStore {
    registry: Arc<SchemaRegistry>,
    journal: Journal,
    tables: BTreeMap<TableKind, BTreeMap<u64, Row>>,
    next_row_id: u64,
    audit: Vec<AuditEvent>,
}

impl RecordStore {
    /// Opens the store in `data_dir`, replaying its journal.
    ///
    /// # Errors
    ///
    /// `SECMAR_DATA_CORRUPTION` if any journal line fails verification.
    pub fn open(data_dir: &Path, registry: Arc<SchemaRegistry>) -> StorageResult<Self> {
        let (journal, entries) = Journal::open(data_dir).map_err(|e| {
            if matches!(e, StorageError::Corruption { .. }) {
                error!(event = Event::StoreCorruption.as_str(), error = %e);
            }
            e
        })?;

        let mut store = Self {
            registry,
            journal,
            tables: TableKind::ALL
                .into_iter()
                .map(|kind| (kind, BTreeMap::new()))
                .collect(),
            next_row_id: 1,
            audit: Vec::new(),
        };
        for entry in entries {
            store.apply(entry);
        }

        info!(
            event = Event::StoreOpened.as_str(),
            seq = store.journal.last_seq(),
            operations = store.row_count(TableKind::Operations),
            flotteurs = store.row_count(TableKind::Flotteurs),
            resultats_humain = store.row_count(TableKind::ResultatsHumain),
            "record store opened"
        );
        Ok(store)
    }

    /// Returns the schema registry the store validates against.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: TableKind) -> usize {
        self.table(table).len()
    }

    /// Rows of `table` in insertion order, with their row ids.
    pub fn rows(&self, table: TableKind) -> impl Iterator<Item = (u64, &Row)> {
        self.table(table).iter().map(|(id, row)| (*id, row))
    }

    /// Looks up a row by key: `operation_id` for operations, row id otherwise.
    pub fn get(&self, table: TableKind, key: &Value) -> Option<&Row> {
        self.locate(table, key)
            .and_then(|row_id| self.table(table).get(&row_id))
    }

    /// Every audit event, in commit order.
    pub fn audit_events(&self) -> &[AuditEvent] {
        &self.audit
    }

    /// Inserts a row, returning the audit event it emitted.
    ///
    /// The row is validated against its schema, then projected onto the
    /// declared columns (undeclared columns of non-strict tables are
    /// dropped, absent columns stored as null).
    pub fn insert(&mut self, table: TableKind, row: &Row, actor: &str) -> StorageResult<AuditEvent> {
        let schema = self.registry.get(table);
        validate(schema, row)?;

        let mut stored = schema.template_row();
        for (field, value) in row {
            if let Some(slot) = stored.get_mut(field) {
                *slot = value.clone();
            }
        }

        self.check_unique(schema, &stored, None)?;
        self.check_parent(table, &stored)?;

        let row_id = self.next_row_id;
        let audit = AuditEvent::new(
            table,
            AuditAction::Insert,
            self.record_id(table, row_id, &stored),
            actor,
        )
        .with_changes(diff_rows(&Row::new(), &stored));

        self.commit(vec![Change {
            mutation: Mutation::Insert {
                table,
                row_id,
                row: stored,
            },
            audit: audit.clone(),
        }])?;
        Ok(audit)
    }

    /// Applies field changes to one row.
    ///
    /// Returns `Ok(None)` without writing when `changes` is empty or leaves
    /// every value as it was.
    pub fn update(
        &mut self,
        table: TableKind,
        key: &Value,
        changes: &Row,
        actor: &str,
    ) -> StorageResult<Option<AuditEvent>> {
        if changes.is_empty() {
            return Ok(None);
        }

        let schema = self.registry.get(table);
        let row_id = self.locate(table, key).ok_or_else(|| StorageError::NotFound {
            table,
            key: key.clone(),
        })?;
        let before = self
            .table(table)
            .get(&row_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                table,
                key: key.clone(),
            })?;

        let mut after = before.clone();
        for (field, value) in changes {
            if !schema.declares(field) {
                return Err(StorageError::UnknownField {
                    table,
                    field: field.clone(),
                });
            }
            if table.primary_key() == Some(field.as_str()) && before.get(field) != Some(value) {
                return Err(StorageError::ImmutableKey {
                    table,
                    field: field.clone(),
                });
            }
            after.insert(field.clone(), value.clone());
        }

        let field_changes = diff_rows(&before, &after);
        if field_changes.is_empty() {
            return Ok(None);
        }

        validate(schema, &after)?;
        self.check_unique(schema, &after, Some(row_id))?;
        self.check_parent(table, &after)?;

        let audit = AuditEvent::new(
            table,
            AuditAction::Update,
            self.record_id(table, row_id, &after),
            actor,
        )
        .with_changes(field_changes);

        self.commit(vec![Change {
            mutation: Mutation::Update {
                table,
                row_id,
                row: after,
            },
            audit: audit.clone(),
        }])?;
        Ok(Some(audit))
    }

    /// Deletes one row; deleting an operation also deletes its children.
    ///
    /// Returns one audit event per removed row, children first.
    pub fn delete(
        &mut self,
        table: TableKind,
        key: &Value,
        actor: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let row_id = self.locate(table, key).ok_or_else(|| StorageError::NotFound {
            table,
            key: key.clone(),
        })?;

        let mut doomed: Vec<(TableKind, u64)> = Vec::new();
        if table == TableKind::Operations {
            if let Some(operation_id) = self.table(table).get(&row_id).and_then(|r| r.get(PARENT_KEY))
            {
                for child in TableKind::ALL.into_iter().filter(|k| k.parent() == Some(table)) {
                    doomed.extend(
                        self.table(child)
                            .iter()
                            .filter(|(_, row)| row.get(PARENT_KEY) == Some(operation_id))
                            .map(|(id, _)| (child, *id)),
                    );
                }
            }
        }
        doomed.push((table, row_id));

        let mut changes = Vec::with_capacity(doomed.len());
        for (kind, id) in doomed {
            let Some(row) = self.table(kind).get(&id) else {
                continue;
            };
            let audit = AuditEvent::new(
                kind,
                AuditAction::Delete,
                self.record_id(kind, id, row),
                actor,
            )
            .with_changes(diff_rows(row, &Row::new()));
            changes.push(Change {
                mutation: Mutation::Delete {
                    table: kind,
                    row_id: id,
                },
                audit,
            });
        }

        let events = changes.iter().map(|c| c.audit.clone()).collect();
        self.commit(changes)?;
        Ok(events)
    }

    fn table(&self, table: TableKind) -> &BTreeMap<u64, Row> {
        static EMPTY: BTreeMap<u64, Row> = BTreeMap::new();
        self.tables.get(&table).unwrap_or(&EMPTY)
    }

    fn locate(&self, table: TableKind, key: &Value) -> Option<u64> {
        match table.primary_key() {
            Some(pk) => self
                .table(table)
                .iter()
                .find(|(_, row)| row.get(pk) == Some(key))
                .map(|(id, _)| *id),
            None => key
                .as_u64()
                .filter(|row_id| self.table(table).contains_key(row_id)),
        }
    }

    fn record_id(&self, table: TableKind, row_id: u64, row: &Row) -> Value {
        table
            .primary_key()
            .and_then(|pk| row.get(pk).cloned())
            .unwrap_or_else(|| json!(row_id))
    }

    /// Rejects `row` if it repeats a unique value of another stored row.
    fn check_unique(
        &self,
        schema: &TableSchema,
        row: &Row,
        skip: Option<u64>,
    ) -> StorageResult<()> {
        let singles = schema
            .fields()
            .iter()
            .filter(|f| f.unique)
            .map(|f| vec![f.name.clone()]);
        let keys: Vec<Vec<String>> = singles.chain(schema.unique_together().iter().cloned()).collect();

        for columns in keys {
            let Some(values) = key_values(row, &columns) else {
                continue;
            };
            let clash = self
                .table(schema.kind())
                .iter()
                .filter(|(id, _)| Some(**id) != skip)
                .any(|(_, other)| key_values(other, &columns).as_ref() == Some(&values));
            if clash {
                let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
                return Err(StorageError::DuplicateKey {
                    table: schema.kind(),
                    columns,
                    value: format!("({})", rendered.join(", ")),
                });
            }
        }
        Ok(())
    }

    /// Rejects a child row whose operation does not exist.
    fn check_parent(&self, table: TableKind, row: &Row) -> StorageResult<()> {
        let Some(parent) = table.parent() else {
            return Ok(());
        };
        let operation_id = row.get(PARENT_KEY).cloned().unwrap_or(Value::Null);
        if self.locate(parent, &operation_id).is_none() {
            return Err(StorageError::MissingParent {
                table,
                operation_id,
            });
        }
        Ok(())
    }

    /// Journals `changes` as one transaction, then applies them.
    fn commit(&mut self, changes: Vec<Change>) -> StorageResult<()> {
        let entry = self.journal.append(changes)?;
        debug!(
            event = Event::StoreCommit.as_str(),
            seq = entry.seq,
            changes = entry.changes.len()
        );
        self.apply(entry);
        Ok(())
    }

    fn apply(&mut self, entry: JournalEntry) {
        for change in entry.changes {
            match change.mutation {
                Mutation::Insert { table, row_id, row } | Mutation::Update { table, row_id, row } => {
                    self.next_row_id = self.next_row_id.max(row_id + 1);
                    self.tables.entry(table).or_default().insert(row_id, row);
                }
                Mutation::Delete { table, row_id } => {
                    self.tables.entry(table).or_default().remove(&row_id);
                }
            }
            self.audit.push(change.audit);
        }
    }
}

/// Runs the per-row checks; batch-level checks do not apply to one row.
fn validate(schema: &TableSchema, row: &Row) -> StorageResult<()> {
    let report = validate_row(row, schema, true);
    if report.is_success() {
        Ok(())
    } else {
        Err(StorageError::invalid(schema.kind(), report))
    }
}

/// Values of `columns` in `row`, or `None` if any is null or absent.
fn key_values(row: &Row, columns: &[String]) -> Option<Vec<Value>> {
    columns
        .iter()
        .map(|c| row.get(c).filter(|v| !v.is_null()).cloned())
        .collect()
}
