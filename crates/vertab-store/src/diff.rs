//! Commit-to-commit diff reports

use crate::errors::Result;
use crate::graph::commits;
use crate::location::Store;
use crate::snapshot::load_snapshot;
use std::collections::BTreeSet;
use vertab_core::diff::{diff_tables, CommitDiff, TableDiffSummary};
use vertab_core::{CommitId, VtError};

/// Per-table diff between two commits.
///
/// Tables whose snapshot digest is unchanged are not compared row by row.
///
/// ## Errors
///
/// - `ReferenceNotFound`: either commit is unknown
/// - `MissingBlob`: a snapshot referenced by a commit is gone
pub fn diff_commits(store: &Store, from: &CommitId, to: &CommitId) -> Result<CommitDiff> {
    let before = commits::require_commit(store.conn(), from)?;
    let after = commits::require_commit(store.conn(), to)?;

    let names: BTreeSet<&String> = before.tables.keys().chain(after.tables.keys()).collect();
    let mut summaries = Vec::with_capacity(names.len());

    for name in names {
        let old = before.table_digest(name);
        let new = after.table_digest(name);

        if let (Some(a), Some(b)) = (old, new) {
            if a == b {
                let rows = load_snapshot(store.cas(), a)?.num_rows() as u64;
                summaries.push(TableDiffSummary::unchanged(name.as_str(), rows));
                continue;
            }
        }

        let old = old.map(|d| load_snapshot(store.cas(), d)).transpose()?;
        let new = new.map(|d| load_snapshot(store.cas(), d)).transpose()?;
        let summary = diff_tables(name, old.as_ref(), new.as_ref())
            .map_err(|e| VtError::from(e).with_op("diff_commits").with_table(name.as_str()))?;
        summaries.push(summary);
    }

    Ok(CommitDiff::new(from.clone(), to.clone(), summaries))
}
