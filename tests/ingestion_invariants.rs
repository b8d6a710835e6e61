//! Ingestion Coordinator Invariant Tests
//!
//! Test Categories:
//! 1. Count reconciliation
//! 2. Invalid rows never reach persistence
//! 3. Quarantine content matches the rejected rows
//! 4. End to end: CSV upload into the record store

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use secmar::batch::{read_csv, read_json, row_from_value, Batch, Row};
use secmar::ingest::{IngestionCoordinator, PersistError, QuarantineRef};
use secmar::quarantine::{FsMedium, MemoryMedium, QuarantineStore};
use secmar::schema::{SchemaRegistry, TableKind, TableSchema};
use secmar::storage::{RecordStore, TablePersister};

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::standard().unwrap())
}

fn operation(schema: &TableSchema, values: Value) -> Row {
    let mut row = schema.template_row();
    row.insert("type_operation".into(), json!("SAR"));
    row.insert("cross_name".into(), json!("Gris-Nez"));
    row.insert("departement".into(), json!("Pas-de-Calais"));
    for (k, v) in row_from_value(values).unwrap() {
        row.insert(k, v);
    }
    row
}

fn memory_coordinator() -> IngestionCoordinator<MemoryMedium> {
    IngestionCoordinator::new(QuarantineStore::new(MemoryMedium::new()))
}

// =============================================================================
// COUNT RECONCILIATION
// =============================================================================

/// Test: valid + invalid = total and inserted + insertion errors = valid.
#[test]
fn test_counts_reconcile() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let coordinator = memory_coordinator();

    let batches: Vec<Batch> = vec![
        Batch::default(),
        (1..=4).map(|id| operation(schema, json!({"operation_id": id}))).collect(),
        vec![
            operation(schema, json!({"operation_id": 1, "mer_force": 11})),
            operation(schema, json!({"operation_id": 2})),
            operation(schema, json!({"operation_id": 3})),
            operation(schema, json!({"operation_id": 4, "latitude": "48N"})),
        ]
        .into(),
    ];

    for (n, batch) in batches.into_iter().enumerate() {
        // Refuse every other row so both counters move.
        let mut calls = 0;
        let mut persist = |_: &Row| -> Result<bool, PersistError> {
            calls += 1;
            if calls % 2 == 0 {
                Err("store offline".into())
            } else {
                Ok(true)
            }
        };
        let source = format!("batch-{}", n);
        let outcome = coordinator.ingest(batch, &source, schema, &mut persist);

        assert_eq!(outcome.valid_rows + outcome.invalid_rows, outcome.total_rows);
        assert_eq!(
            outcome.inserted_rows + outcome.insertion_errors.len(),
            outcome.valid_rows
        );
        assert_eq!(
            outcome.validation_report.total_errors,
            outcome.validation_report.field_errors.len()
                + outcome.validation_report.batch_errors.len()
        );
    }
}

// =============================================================================
// OUT-OF-RANGE SCENARIO
// =============================================================================

/// Test: one out-of-range wind force in three rows.
///
/// Two rows are persisted in order, one entry is quarantined holding exactly
/// the offending row, and the report names the field and the row.
#[test]
fn test_out_of_range_wind_force_is_quarantined() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let coordinator = memory_coordinator();

    let rows = vec![
        operation(schema, json!({"operation_id": 101, "vent_force": 4})),
        operation(schema, json!({"operation_id": 102, "vent_force": 15})),
        operation(schema, json!({"operation_id": 103, "vent_force": -1})),
    ];
    let offending = rows[1].clone();

    let mut persisted: Vec<Row> = Vec::new();
    let mut persist = |row: &Row| -> Result<bool, PersistError> {
        persisted.push(row.clone());
        Ok(true)
    };
    let now = Utc.with_ymd_and_hms(2024, 8, 3, 14, 5, 9).unwrap();
    let outcome = coordinator.ingest_at(rows.into(), "operations_upload", schema, &mut persist, now);

    assert_eq!(outcome.total_rows, 3);
    assert_eq!(outcome.valid_rows, 2);
    assert_eq!(outcome.invalid_rows, 1);
    assert_eq!(outcome.inserted_rows, 2);
    assert!(outcome.insertion_errors.is_empty());

    let ids: Vec<&Value> = persisted.iter().map(|r| &r["operation_id"]).collect();
    assert_eq!(ids, vec![&json!(101), &json!(103)]);

    let report = &outcome.validation_report;
    assert_eq!(report.field_errors.len(), 1);
    assert_eq!(report.field_errors[0].field, "vent_force");
    assert_eq!(report.field_errors[0].row, 1);
    assert!(report.batch_errors.is_empty());

    let id = outcome.quarantine.id().unwrap();
    assert_eq!(id, "quarantine_operations_upload_20240803_140509.json");
    let entry = coordinator.quarantine_store().load_entry(id).unwrap();
    assert_eq!(entry.total_invalid_rows, 1);
    assert_eq!(entry.invalid_data, vec![offending]);
    assert_eq!(entry.validation_report.invalid_row_indices, vec![1]);
    assert_eq!(&entry.validation_report, report);
    assert_eq!(coordinator.quarantine_store().medium().len(), 1);
}

// =============================================================================
// INVALID ROWS NEVER PERSISTED
// =============================================================================

/// Test: every row sharing a duplicate id is quarantined, none persisted.
#[test]
fn test_duplicate_ids_never_reach_persistence() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let coordinator = memory_coordinator();

    let batch: Batch = vec![
        operation(schema, json!({"operation_id": 7})),
        operation(schema, json!({"operation_id": 8})),
        operation(schema, json!({"operation_id": 7, "evenement": "Chavirement"})),
    ]
    .into();

    let mut persisted: Vec<Value> = Vec::new();
    let mut persist = |row: &Row| -> Result<bool, PersistError> {
        persisted.push(row["operation_id"].clone());
        Ok(true)
    };
    let outcome = coordinator.ingest(batch, "doublons", schema, &mut persist);

    assert_eq!(persisted, vec![json!(8)]);
    assert_eq!(outcome.invalid_rows, 2);
    assert_eq!(outcome.validation_report.batch_errors[0].rows, vec![0, 2]);

    let entry = coordinator
        .quarantine_store()
        .load_entry(outcome.quarantine.id().unwrap())
        .unwrap();
    let quarantined: Vec<&Value> = entry.invalid_data.iter().map(|r| &r["operation_id"]).collect();
    assert_eq!(quarantined, vec![&json!(7), &json!(7)]);
    assert_eq!(entry.validation_report.invalid_row_indices, vec![0, 2]);
    assert_eq!(entry.invalid_data[1]["evenement"], "Chavirement");
}

/// Test: a clean batch writes no quarantine entry.
#[test]
fn test_clean_batch_needs_no_quarantine() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let coordinator = memory_coordinator();

    let batch: Batch = (1..=3).map(|id| operation(schema, json!({"operation_id": id}))).collect();
    let mut persist = |_: &Row| -> Result<bool, PersistError> { Ok(true) };
    let outcome = coordinator.ingest(batch, "clean", schema, &mut persist);

    assert_eq!(outcome.quarantine, QuarantineRef::NotNeeded);
    assert!(outcome.is_clean());
    assert!(coordinator.quarantine_store().medium().is_empty());
}

// =============================================================================
// END TO END
// =============================================================================

fn operations_csv(schema: &TableSchema, rows: &[Value]) -> String {
    let columns: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
    let mut text = columns.join(",");
    text.push('\n');
    for values in rows {
        let row = operation(schema, values.clone());
        let cells: Vec<String> = columns
            .iter()
            .map(|c| match &row[*c] {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        text.push_str(&cells.join(","));
        text.push('\n');
    }
    text
}

/// Test: a CSV upload lands in the store and its bad rows on disk.
#[test]
fn test_csv_upload_into_record_store() {
    let tmp = TempDir::new().unwrap();
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let mut store = RecordStore::open(&tmp.path().join("store"), Arc::clone(&registry)).unwrap();
    let coordinator =
        IngestionCoordinator::new(QuarantineStore::new(FsMedium::new(tmp.path().join("quarantine"))));

    let csv = operations_csv(
        schema,
        &[
            json!({"operation_id": 1, "vent_force": 5, "est_metropolitain": true}),
            json!({"operation_id": 2, "vent_force": 15}),
            json!({"operation_id": 3, "latitude": 47.5, "longitude": -3.2}),
        ],
    );
    let batch = read_csv(csv.as_bytes(), schema).unwrap();

    let outcome = {
        let mut persister = TablePersister::for_source(&mut store, TableKind::Operations, "ops.csv");
        coordinator.ingest(batch, "ops.csv", schema, &mut persister)
    };

    assert_eq!(outcome.inserted_rows, 2);
    assert_eq!(outcome.invalid_rows, 1);
    assert_eq!(store.row_count(TableKind::Operations), 2);
    assert!(store.get(TableKind::Operations, &json!(2)).is_none());
    assert_eq!(store.get(TableKind::Operations, &json!(1)).unwrap()["est_metropolitain"], true);

    let events = store.audit_events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.actor == "system_ops.csv"));

    let id = outcome.quarantine.id().unwrap();
    assert!(tmp.path().join("quarantine").join(id).is_file());
}

/// Test: rows already in the store are refused without aborting the batch.
#[test]
fn test_store_rejections_become_insertion_errors() {
    let tmp = TempDir::new().unwrap();
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let mut store = RecordStore::open(tmp.path(), Arc::clone(&registry)).unwrap();
    store
        .insert(TableKind::Operations, &operation(schema, json!({"operation_id": 2})), "operator")
        .unwrap();

    let coordinator = memory_coordinator();
    let batch: Batch = (1..=3).map(|id| operation(schema, json!({"operation_id": id}))).collect();
    let outcome = {
        let mut persister = TablePersister::for_source(&mut store, TableKind::Operations, "replay");
        coordinator.ingest(batch, "replay", schema, &mut persister)
    };

    assert_eq!(outcome.valid_rows, 3);
    assert_eq!(outcome.inserted_rows, 2);
    assert_eq!(outcome.insertion_errors.len(), 1);
    assert_eq!(outcome.insertion_errors[0].row, 1);
    assert!(outcome.insertion_errors[0].message.contains("duplicate key"));
    assert_eq!(store.row_count(TableKind::Operations), 3);
}

/// Test: a row valid in its batch is stored even if it omits a nullable column.
#[test]
fn test_sparse_json_rows_are_all_stored() {
    let tmp = TempDir::new().unwrap();
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let mut store = RecordStore::open(tmp.path(), Arc::clone(&registry)).unwrap();
    let coordinator = memory_coordinator();

    let first = operation(schema, json!({"operation_id": 1, "evenement": "Chavirement"}));
    let mut second = operation(schema, json!({"operation_id": 2}));
    second.remove("evenement");
    let lines = format!(
        "{}\n{}\n",
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    let batch = read_json(lines.as_bytes()).unwrap();

    let outcome = {
        let mut persister = TablePersister::for_source(&mut store, TableKind::Operations, "sparse");
        coordinator.ingest(batch, "sparse", schema, &mut persister)
    };

    assert_eq!(outcome.valid_rows, 2);
    assert!(outcome.insertion_errors.is_empty(), "{:?}", outcome.insertion_errors);
    assert_eq!(outcome.inserted_rows, outcome.valid_rows);
    assert_eq!(
        store.get(TableKind::Operations, &json!(2)).unwrap()["evenement"],
        Value::Null
    );
}
