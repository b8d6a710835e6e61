//! Persistence capability injected into the coordinator

use std::error::Error;

use crate::batch::Row;

/// Error raised by a persistence capability
pub type PersistError = Box<dyn Error + Send + Sync>;

/// Writes one valid row to the system of record.
///
/// Implementations write the row and emit its audit event as one atomic
/// unit. `Ok(false)` and `Err(_)` both mean nothing was written; the
/// coordinator records either as an insertion error for that row and moves
/// on to the next.
pub trait PersistRow {
    fn persist_row(&mut self, row: &Row) -> Result<bool, PersistError>;
}

impl<F> PersistRow for F
where
    F: FnMut(&Row) -> Result<bool, PersistError>,
{
    fn persist_row(&mut self, row: &Row) -> Result<bool, PersistError> {
        self(row)
    }
}
