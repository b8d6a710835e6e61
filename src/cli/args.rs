//! CLI argument definitions using clap
//!
//! Commands:
//! - secmar init --config <path>
//! - secmar validate --table <t> --input <file>
//! - secmar ingest --config <path> --table <t> --input <file> [--source <s>]
//! - secmar quarantine list|show --config <path>
//! - secmar update --config <path> --table <t> --key <k> --set field=value...
//! - secmar delete --config <path> --table <t> --key <k>
//! - secmar audit --config <path> [--table <t>]
//! - secmar template --table <t>

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::batch::InputFormat;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::schema::TableKind;

/// SEC MAR ingestion: validate rescue records, quarantine the invalid ones
#[derive(Parser, Debug)]
#[command(name = "secmar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the store and quarantine directories
    Init {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Classify a file without writing anything
    Validate {
        /// Target table: operations, flotteurs or resultats_humain
        #[arg(long)]
        table: TableKind,

        /// CSV or JSON file to check
        #[arg(long)]
        input: PathBuf,

        /// Input format; guessed from the extension when omitted
        #[arg(long)]
        format: Option<InputFormat>,

        /// Stop at the first failure of each row
        #[arg(long)]
        eager: bool,
    },

    /// Validate a file, quarantine invalid rows and store valid ones
    Ingest {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[arg(long)]
        table: TableKind,

        #[arg(long)]
        input: PathBuf,

        /// Where the batch came from; defaults to the input file name
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        format: Option<InputFormat>,
    },

    /// Inspect quarantined batches
    Quarantine {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// Change fields of one stored row
    Update {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[arg(long, default_value = "operations")]
        table: TableKind,

        /// operation_id for operations, row id for other tables
        #[arg(long, value_parser = parse_json_value)]
        key: Value,

        /// field=value, value parsed as JSON when possible
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        changes: Vec<(String, Value)>,
    },

    /// Delete one stored row (operations cascade to their children)
    Delete {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[arg(long, default_value = "operations")]
        table: TableKind,

        #[arg(long, value_parser = parse_json_value)]
        key: Value,
    },

    /// Print the audit trail
    Audit {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Only events for this table
        #[arg(long)]
        table: Option<TableKind>,
    },

    /// Print the column layout expected for a table
    Template {
        #[arg(long)]
        table: TableKind,
    },
}

#[derive(Subcommand, Debug)]
pub enum QuarantineAction {
    /// List entry identifiers with their row counts
    List,

    /// Print one entry
    Show {
        /// Entry identifier, e.g. quarantine_upload_20240803_140509.json
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Parses JSON, falling back to a plain string.
pub fn parse_json_value(raw: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

/// Parses `field=value`.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok((field.to_string(), parse_json_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("vent_force=4").unwrap(),
            ("vent_force".to_string(), json!(4))
        );
        assert_eq!(
            parse_assignment("cross_name=Etel").unwrap(),
            ("cross_name".to_string(), json!("Etel"))
        );
        assert_eq!(
            parse_assignment("latitude=null").unwrap(),
            ("latitude".to_string(), Value::Null)
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn test_parse_update_command() {
        let cli = Cli::try_parse_from([
            "secmar", "update", "--key", "12", "--set", "mer_force=3", "--set", "evenement=Chavirement",
        ])
        .unwrap();
        match cli.command {
            Command::Update {
                table,
                key,
                changes,
                ..
            } => {
                assert_eq!(table, TableKind::Operations);
                assert_eq!(key, json!(12));
                assert_eq!(changes.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        assert!(Cli::try_parse_from(["secmar", "template", "--table", "navires"]).is_err());
    }
}
