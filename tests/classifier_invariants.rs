//! Row Classifier Invariant Tests
//!
//! Test Categories:
//! 1. Partition and order preservation
//! 2. Report accounting
//! 3. Determinism
//! 4. Sentinel handling
//! 5. Structural checks (types, nulls, undeclared fields, uniqueness)

use serde_json::{json, Value};

use secmar::batch::{row_from_value, Batch, Row};
use secmar::schema::{SchemaRegistry, TableKind, TableSchema};
use secmar::validation::{check_names, classify, ReportStatus};

fn registry() -> SchemaRegistry {
    SchemaRegistry::standard().unwrap()
}

/// Operations row with every declared column present, the given ones set.
fn operation(schema: &TableSchema, values: Value) -> Row {
    let mut row = schema.template_row();
    row.insert("type_operation".into(), json!("SAR"));
    row.insert("departement".into(), json!("Finistère"));
    for (k, v) in row_from_value(values).unwrap() {
        row.insert(k, v);
    }
    row
}

fn operations_batch(schema: &TableSchema, rows: &[Value]) -> Batch {
    rows.iter().map(|v| operation(schema, v.clone())).collect()
}

/// A spread of batches mixing valid rows, bad values, type errors and duplicates
fn sample_batches(schema: &TableSchema) -> Vec<Batch> {
    vec![
        Batch::default(),
        operations_batch(schema, &[json!({"operation_id": 1})]),
        operations_batch(
            schema,
            &[
                json!({"operation_id": 1, "vent_force": 3}),
                json!({"operation_id": 2, "vent_force": 15}),
                json!({"operation_id": 3, "vent_force": -1}),
            ],
        ),
        operations_batch(
            schema,
            &[
                json!({"operation_id": 10, "latitude": 95.0, "longitude": 200.0}),
                json!({"operation_id": 10, "mer_force": "rough"}),
                json!({"operation_id": null}),
                json!({"operation_id": 11, "type_operation": "sar"}),
                json!({"operation_id": 12, "type_operation": "XYZ"}),
            ],
        ),
    ]
}

// =============================================================================
// PARTITION AND ORDER
// =============================================================================

/// Test: valid and invalid partition the batch, each in batch order.
#[test]
fn test_subsets_partition_batch_in_order() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);

    for batch in sample_batches(schema) {
        let expected: Vec<Row> = batch.rows().to_vec();
        let outcome = classify(batch, schema, true);

        assert_eq!(outcome.total_rows(), expected.len());

        let mut indices: Vec<usize> = outcome
            .valid_indices()
            .into_iter()
            .chain(outcome.invalid_indices())
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..expected.len()).collect::<Vec<_>>());

        assert!(outcome.valid_indices().windows(2).all(|w| w[0] < w[1]));
        assert!(outcome.invalid_indices().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(outcome.report.invalid_row_indices, outcome.invalid_indices());

        for classified in outcome.valid.iter().chain(&outcome.invalid) {
            assert_eq!(classified.row, expected[classified.index]);
        }
    }
}

/// Test: eager and lazy modes agree on the partition.
#[test]
fn test_eager_and_lazy_partition_agree() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);

    for batch in sample_batches(schema) {
        let lazy = classify(batch.clone(), schema, true);
        let eager = classify(batch, schema, false);
        assert_eq!(lazy.valid_indices(), eager.valid_indices());
        assert!(eager.report.total_errors <= lazy.report.total_errors);
    }
}

// =============================================================================
// REPORT ACCOUNTING
// =============================================================================

/// Test: total_errors is the sum of both lists; status follows it.
#[test]
fn test_total_errors_accounting() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);

    for batch in sample_batches(schema) {
        let report = classify(batch, schema, true).report;
        assert_eq!(
            report.total_errors,
            report.field_errors.len() + report.batch_errors.len()
        );
        let expected = if report.total_errors == 0 {
            ReportStatus::Success
        } else {
            ReportStatus::Failed
        };
        assert_eq!(report.status, expected);
    }
}

/// Test: a failing check always yields at least one field-level error.
#[test]
fn test_failed_check_is_reported_per_field() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let batch = operations_batch(schema, &[json!({"operation_id": 1, "mer_force": 10})]);

    let report = classify(batch, schema, true).report;
    assert_eq!(report.field_errors.len(), 1);
    assert_eq!(report.field_errors[0].field, "mer_force");
    assert_eq!(report.field_errors[0].check, "in_range");
}

/// Test: lazy mode reports every failing field of a row.
#[test]
fn test_lazy_collects_every_failure() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let batch = operations_batch(
        schema,
        &[json!({"operation_id": 1, "latitude": 95.0, "longitude": 200.0, "vent_force": 13})],
    );

    let lazy = classify(batch.clone(), schema, true).report;
    let eager = classify(batch, schema, false).report;
    assert_eq!(lazy.errors_for_row(0).count(), 3);
    assert_eq!(eager.errors_for_row(0).count(), 1);
}

// =============================================================================
// DETERMINISM
// =============================================================================

/// Test: classifying twice gives identical partitions and reports.
#[test]
fn test_classification_is_idempotent() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);

    for batch in sample_batches(schema) {
        let first = classify(batch.clone(), schema, true);
        let second = classify(batch, schema, true);
        assert_eq!(first, second);
    }
}

// =============================================================================
// SENTINELS
// =============================================================================

/// Test: -1 passes every bounded field; just past the range does not.
#[test]
fn test_unknown_sentinel_bypasses_range() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);

    let bounded = [
        ("vent_force", 13.0),
        ("mer_force", 10.0),
        ("vent_direction", 361.0),
        ("latitude", 90.5),
        ("longitude", -180.5),
    ];
    for (field, outside) in bounded {
        let mut row = operation(schema, json!({"operation_id": 1}));
        row.insert(field.to_string(), json!(-1));
        let sentinel = Batch::new(vec![row.clone()]);
        assert!(
            classify(sentinel, schema, true).is_clean(),
            "{} = -1 should be valid",
            field
        );

        row.insert(field.to_string(), json!(outside));
        let beyond = Batch::new(vec![row]);
        assert!(
            !classify(beyond, schema, true).is_clean(),
            "{} = {} should be invalid",
            field,
            outside
        );
    }
}

/// Test: other negative values are still out of range.
#[test]
fn test_only_the_sentinel_is_exempt() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let batch = operations_batch(schema, &[json!({"operation_id": 1, "vent_force": -2})]);
    assert!(!classify(batch, schema, true).is_clean());
}

// =============================================================================
// STRUCTURAL CHECKS
// =============================================================================

/// Test: values are never coerced across types.
#[test]
fn test_type_mismatch_is_not_coerced() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let batch = operations_batch(
        schema,
        &[
            json!({"operation_id": "7"}),
            json!({"operation_id": 8, "numero_sitrep": 2.5}),
            json!({"operation_id": 9, "est_metropolitain": "true"}),
        ],
    );

    let outcome = classify(batch, schema, true);
    assert!(outcome.valid.is_empty());
    assert!(outcome
        .report
        .field_errors
        .iter()
        .all(|e| e.check == check_names::DTYPE));
    assert_eq!(outcome.invalid[0].row["operation_id"], json!("7"));
}

/// Test: a null primary key is rejected.
#[test]
fn test_null_in_non_nullable_field() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let batch = operations_batch(schema, &[json!({"operation_id": null})]);

    let report = classify(batch, schema, true).report;
    assert_eq!(report.field_errors[0].check, check_names::NOT_NULLABLE);
}

/// Test: strict schemas reject undeclared fields; operations tolerates them.
#[test]
fn test_undeclared_fields() {
    let registry = registry();

    let flotteurs = registry.get(TableKind::Flotteurs);
    let row = row_from_value(json!({
        "operation_id": 1,
        "numero_ordre": 1,
        "pavillon": "Français",
        "resultat_flotteur": "Assisté",
        "type_flotteur": "Annexe",
        "categorie_flotteur": "Plaisance",
        "numero_immatriculation": null,
        "couleur": "rouge"
    }))
    .unwrap();
    let report = classify(Batch::new(vec![row]), flotteurs, true).report;
    assert_eq!(report.field_errors.len(), 1);
    assert_eq!(report.field_errors[0].field, "couleur");
    assert_eq!(report.field_errors[0].check, check_names::UNDECLARED_FIELD);

    let operations = registry.get(TableKind::Operations);
    let batch = operations_batch(operations, &[json!({"operation_id": 1, "couleur": "rouge"})]);
    assert!(classify(batch, operations, true).is_clean());
}

/// Test: a duplicate id implicates every row carrying it.
#[test]
fn test_duplicate_identifier_flags_all_occurrences() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let batch = operations_batch(
        schema,
        &[
            json!({"operation_id": 4}),
            json!({"operation_id": 5}),
            json!({"operation_id": 4}),
        ],
    );

    let outcome = classify(batch, schema, true);
    assert_eq!(outcome.invalid_indices(), vec![0, 2]);
    assert_eq!(outcome.valid_indices(), vec![1]);
    assert_eq!(outcome.report.batch_errors.len(), 1);
    assert_eq!(outcome.report.batch_errors[0].check, check_names::UNIQUE);
    assert_eq!(outcome.report.batch_errors[0].rows, vec![0, 2]);
}

/// Test: composite keys only clash when every column matches.
#[test]
fn test_composite_key_within_batch() {
    let registry = registry();
    let schema = registry.get(TableKind::Flotteurs);
    let flotteur = |operation_id: i64, numero_ordre: i64| {
        row_from_value(json!({
            "operation_id": operation_id,
            "numero_ordre": numero_ordre,
            "pavillon": "Français",
            "resultat_flotteur": "Assisté",
            "type_flotteur": "Annexe",
            "categorie_flotteur": "Plaisance",
            "numero_immatriculation": null
        }))
        .unwrap()
    };

    let batch = Batch::new(vec![flotteur(1, 1), flotteur(1, 2), flotteur(2, 1), flotteur(1, 1)]);
    let outcome = classify(batch, schema, true);
    assert_eq!(outcome.invalid_indices(), vec![0, 3]);
    assert_eq!(
        outcome.report.batch_errors[0].check,
        check_names::UNIQUE_TOGETHER
    );
}

/// Test: a required column missing from the whole batch fails every row.
#[test]
fn test_column_missing_from_batch() {
    let registry = registry();
    let schema = registry.get(TableKind::Operations);
    let row = row_from_value(json!({"operation_id": 1, "departement": "Var"})).unwrap();

    let outcome = classify(Batch::new(vec![row]), schema, true);
    assert!(outcome.valid.is_empty());
    assert!(outcome
        .report
        .batch_errors
        .iter()
        .any(|e| e.check == check_names::COLUMN_PRESENT && e.rows == vec![0]));
}
