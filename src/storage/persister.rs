//! Persistence capability backed by the record store

use tracing::debug;

use super::record_store::RecordStore;
use crate::batch::Row;
use crate::ingest::{PersistError, PersistRow};
use crate::schema::TableKind;

/// Inserts rows of one table on behalf of one actor.
///
/// Each row is its own transaction: a refused row leaves nothing behind
/// and does not affect the rows offered after it.
pub struct TablePersister<'a> {
    store: &'a mut RecordStore,
    table: TableKind,
    actor: String,
}

impl<'a> TablePersister<'a> {
    pub fn new(store: &'a mut RecordStore, table: TableKind, actor: impl Into<String>) -> Self {
        Self {
            store,
            table,
            actor: actor.into(),
        }
    }

    /// Actor for rows arriving from an ingestion source: `system_<source>`
    pub fn for_source(store: &'a mut RecordStore, table: TableKind, source: &str) -> Self {
        Self::new(store, table, format!("system_{}", source))
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

impl PersistRow for TablePersister<'_> {
    fn persist_row(&mut self, row: &Row) -> Result<bool, PersistError> {
        let event = self.store.insert(self.table, row, &self.actor)?;
        debug!(table = %self.table, record_id = %event.record_id, "row inserted");
        Ok(true)
    }
}
