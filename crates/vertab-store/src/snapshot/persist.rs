//! Snapshot persistence

use crate::cas::FsStore;
use crate::errors::Result;
use vertab_core::snapshot::TableSnapshot;
use vertab_core::{Table, VtError};

/// Persist a table's canonical snapshot to the CAS.
///
/// Returns the snapshot digest. Identical row sets share one blob, so this is
/// idempotent.
///
/// ## Errors
///
/// - `VtErrorKind::ValidationError`: table is not uniquely keyed
/// - `VtErrorKind::Serialization`: JSON serialization failed
/// - `VtErrorKind::Io`: CAS write failed
pub fn persist_table(cas: &FsStore, tablename: &str, table: &Table) -> Result<String> {
    let snapshot = TableSnapshot::from_table(tablename, table)
        .map_err(|e| VtError::from(e).with_op("persist_table"))?;
    let bytes = snapshot
        .to_bytes()
        .map_err(|e| VtError::from(e).with_op("persist_table"))?;

    let digest = cas.write(&bytes)?;

    tracing::debug!(
        table = tablename,
        digest = %digest,
        rows = snapshot.row_count(),
        size_bytes = bytes.len(),
        "Persisted table snapshot to CAS"
    );
    Ok(digest)
}
