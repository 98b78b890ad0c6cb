//! Snapshot reader

use crate::cas::FsStore;
use crate::errors::{table_not_found, Result};
use crate::graph::{commits, resolve_tip};
use crate::location::Store;
use vertab_core::snapshot::TableSnapshot;
use vertab_core::{CommitId, Reference, Table, VertabError, VtError};

/// A materialised table and the commit it was read from
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub table: Table,
    pub commit: CommitId,
}

/// Load a snapshot blob into an owned table
pub fn load_snapshot(cas: &FsStore, digest: &str) -> Result<Table> {
    let bytes = cas.read(digest)?;
    TableSnapshot::from_bytes(&bytes)
        .and_then(TableSnapshot::into_table)
        .map_err(|e: VertabError| VtError::from(e).with_op("load_snapshot"))
}

/// Read a table at a reference.
///
/// The result is a deep copy sorted by primary key; mutating it never
/// touches the store.
///
/// ## Errors
///
/// - `ReferenceNotFound`: branch or commit does not resolve
/// - `TableNotFound`: the table is absent at that commit
/// - `StoreUnavailable`: the database could not be reached
pub fn read_table(store: &Store, reference: &Reference, tablename: &str) -> Result<ReadOutcome> {
    let commit = resolve_tip(store.conn(), reference)?;
    let record = commits::require_commit(store.conn(), &commit)?;

    let digest = record
        .table_digest(tablename)
        .ok_or_else(|| table_not_found(tablename, commit.as_str()))?;

    let mut table = load_snapshot(store.cas(), digest)?;
    table
        .sort_by_key()
        .map_err(|e| VtError::from(e).with_table(tablename))?;

    tracing::debug!(
        table = tablename,
        reference = %reference,
        commit = %commit.short(),
        rows = table.num_rows(),
        "Read table snapshot"
    );
    Ok(ReadOutcome { table, commit })
}

/// Whether `tablename` exists at the reference's current commit
pub fn table_exists(store: &Store, reference: &Reference, tablename: &str) -> Result<bool> {
    let commit = resolve_tip(store.conn(), reference)?;
    let record = commits::require_commit(store.conn(), &commit)?;
    Ok(record.table_digest(tablename).is_some())
}
