//! CLI command implementations
//!
//! Each command loads configuration, builds the subsystems it needs, does
//! one thing and returns a JSON value. `run` wraps that value in the
//! response envelope; nothing else writes to stdout.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::batch::{Batch, InputFormat, Row};
use crate::config::Config;
use crate::ingest::IngestionCoordinator;
use crate::observability::{init_logging, Event, LogFormat};
use crate::quarantine::{FsMedium, QuarantineStore};
use crate::schema::{SchemaRegistry, TableKind, TableSchema};
use crate::storage::{RecordStore, TablePersister, JOURNAL_FILE};
use crate::validation::classify;

use super::args::{Cli, Command, QuarantineAction};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, runs the command and writes its response. On failure
/// the error envelope is written before the error is returned.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match execute(cli.command) {
        Ok(data) => write_response(&data),
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e)
        }
    }
}

/// Runs one command and returns its response payload
pub fn execute(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Validate {
            table,
            input,
            format,
            eager,
        } => {
            init_logging(LogFormat::Text, "warn");
            validate(table, &input, format, eager)
        }
        Command::Ingest {
            config,
            table,
            input,
            source,
            format,
        } => ingest(&config, table, &input, source.as_deref(), format),
        Command::Quarantine { config, action } => quarantine(&config, action),
        Command::Update {
            config,
            table,
            key,
            changes,
        } => update(&config, table, &key, changes),
        Command::Delete { config, table, key } => delete(&config, table, &key),
        Command::Audit { config, table } => audit(&config, table),
        Command::Template { table } => template(table),
    }
}

/// Loads configuration and installs the log subscriber it asks for
fn load_config(path: &Path) -> CliResult<Config> {
    let config = Config::load(path)?;
    init_logging(config.log_format, &config.log_level);
    info!(
        event = Event::ConfigLoaded.as_str(),
        data_dir = %config.data_dir.display(),
        "configuration loaded"
    );
    Ok(config)
}

fn load_registry() -> CliResult<Arc<SchemaRegistry>> {
    let registry = SchemaRegistry::standard()?;
    info!(event = Event::SchemasLoaded.as_str(), tables = registry.all().count());
    Ok(Arc::new(registry))
}

fn is_initialized(config: &Config) -> bool {
    config.store_path().join(JOURNAL_FILE).exists()
}

fn open_store(config: &Config, registry: Arc<SchemaRegistry>) -> CliResult<RecordStore> {
    if !is_initialized(config) {
        return Err(CliError::NotInitialized(config.data_dir.clone()));
    }
    Ok(RecordStore::open(&config.store_path(), registry)?)
}

fn quarantine_store(config: &Config) -> QuarantineStore<FsMedium> {
    QuarantineStore::new(FsMedium::new(config.quarantine_path()))
}

fn read_batch(
    input: &Path,
    format: Option<InputFormat>,
    schema: &TableSchema,
) -> CliResult<Batch> {
    let format = format.unwrap_or_else(|| InputFormat::from_path(input));
    let file = File::open(input).map_err(|source| CliError::OpenInput {
        path: input.to_path_buf(),
        source,
    })?;
    Ok(format.read(BufReader::new(file), schema)?)
}

/// Create the store and quarantine directories
///
/// Refuses to run twice on the same data directory.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = load_config(config_path)?;
    if is_initialized(&config) {
        return Err(CliError::AlreadyInitialized(config.data_dir.clone()));
    }

    fs::create_dir_all(config.quarantine_path())?;
    RecordStore::open(&config.store_path(), load_registry()?)?;

    Ok(json!({
        "initialized": true,
        "store_dir": config.store_path(),
        "quarantine_dir": config.quarantine_path(),
    }))
}

/// Classify a file and report, writing nothing
pub fn validate(
    table: TableKind,
    input: &Path,
    format: Option<InputFormat>,
    eager: bool,
) -> CliResult<Value> {
    let registry = load_registry()?;
    let schema = registry.get(table);
    let batch = read_batch(input, format, schema)?;

    let outcome = classify(batch, schema, !eager);
    Ok(json!({
        "table": table,
        "total_rows": outcome.total_rows(),
        "valid_rows": outcome.valid.len(),
        "invalid_rows": outcome.invalid.len(),
        "invalid_indices": outcome.invalid_indices(),
        "validation_report": outcome.report,
    }))
}

/// Run a file through the ingestion pipeline into the record store
pub fn ingest(
    config_path: &Path,
    table: TableKind,
    input: &Path,
    source: Option<&str>,
    format: Option<InputFormat>,
) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let registry = load_registry()?;
    let mut store = open_store(&config, Arc::clone(&registry))?;
    let schema = registry.get(table);

    let source = source
        .map(str::to_string)
        .or_else(|| {
            input
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "upload".to_string());
    let batch = read_batch(input, format, schema)?;

    let coordinator = IngestionCoordinator::new(quarantine_store(&config))
        .with_max_quarantine_attempts(config.max_quarantine_attempts);
    let mut persister = TablePersister::for_source(&mut store, table, &source);
    let outcome = coordinator.ingest(batch, &source, schema, &mut persister);

    Ok(serde_json::to_value(&outcome)?)
}

/// List or show quarantine entries
pub fn quarantine(config_path: &Path, action: QuarantineAction) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let store = quarantine_store(&config);

    match action {
        QuarantineAction::List => {
            let entries: Vec<Value> = store
                .list_entries()?
                .into_iter()
                .map(|id| match store.load_entry(&id) {
                    Ok(entry) => json!({
                        "id": id,
                        "timestamp": entry.timestamp,
                        "source": entry.source,
                        "total_invalid_rows": entry.total_invalid_rows,
                    }),
                    Err(e) => json!({
                        "id": id,
                        "error": {"code": e.code(), "message": e.to_string()},
                    }),
                })
                .collect();
            Ok(json!({ "entries": entries }))
        }
        QuarantineAction::Show { id } => Ok(serde_json::to_value(store.load_entry(&id)?)?),
    }
}

/// Change fields of one stored row
pub fn update(
    config_path: &Path,
    table: TableKind,
    key: &Value,
    changes: Vec<(String, Value)>,
) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let mut store = open_store(&config, load_registry()?)?;

    let changes: Row = changes.into_iter().collect();
    let event = store.update(table, key, &changes, &config.actor)?;
    Ok(json!({
        "updated": event.is_some(),
        "audit": event,
    }))
}

/// Delete one stored row and anything that depends on it
pub fn delete(config_path: &Path, table: TableKind, key: &Value) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let mut store = open_store(&config, load_registry()?)?;

    let events = store.delete(table, key, &config.actor)?;
    Ok(json!({
        "deleted": events.len(),
        "audit": events,
    }))
}

/// Print the audit trail, oldest first
pub fn audit(config_path: &Path, table: Option<TableKind>) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let store = open_store(&config, load_registry()?)?;

    let events: Vec<_> = store
        .audit_events()
        .iter()
        .filter(|e| table.map_or(true, |t| e.table == t))
        .collect();
    Ok(json!({ "events": events }))
}

/// Column layout of a table, as a CSV header and with each column's rules
pub fn template(table: TableKind) -> CliResult<Value> {
    let registry = load_registry()?;
    let schema = registry.get(table);

    let columns: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
    Ok(json!({
        "table": table,
        "strict": schema.is_strict(),
        "csv_header": columns.join(","),
        "fields": schema.fields(),
        "unique_together": schema.unique_together(),
    }))
}
