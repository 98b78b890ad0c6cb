//! Three-way row merge for a single table.
//!
//! Rows are matched by primary key against the merge base. A side that left a
//! row as it was in the base yields to the other side; rows changed the same
//! way on both sides merge cleanly; anything else is a conflict.

use crate::errors::{MergeConflict, Result};
use crate::model::{RowKey, Table, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of merging one table
#[derive(Debug, Clone, PartialEq)]
pub enum TableMerge {
    /// Merged state; `None` means the table is absent after the merge
    Resolved(Option<Table>),
    Conflicts(Vec<MergeConflict>),
}

fn same(a: Option<&Table>, b: Option<&Table>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_rows_as(b),
        _ => false,
    }
}

fn table_conflict(tablename: &str, reason: &str) -> TableMerge {
    TableMerge::Conflicts(vec![MergeConflict {
        tablename: tablename.to_string(),
        key: None,
        reason: reason.to_string(),
    }])
}

/// Merge `theirs` into `ours` relative to their common ancestor `base`.
///
/// # Errors
///
/// `DuplicateKey` if any side is not uniquely keyed.
pub fn merge_table(
    tablename: &str,
    base: Option<&Table>,
    ours: Option<&Table>,
    theirs: Option<&Table>,
) -> Result<TableMerge> {
    if same(ours, theirs) || same(base, theirs) {
        return Ok(TableMerge::Resolved(ours.cloned()));
    }
    if same(base, ours) {
        return Ok(TableMerge::Resolved(theirs.cloned()));
    }

    let (ours, theirs) = match (ours, theirs) {
        (Some(o), Some(t)) => (o, t),
        _ => {
            return Ok(table_conflict(
                tablename,
                "deleted on one side and modified on the other",
            ))
        }
    };
    if ours.schema() != theirs.schema() {
        return Ok(table_conflict(tablename, "schema changed on both sides"));
    }

    // Rows of a base with another schema cannot tell a deletion from an add
    let base_rows = match base {
        Some(b) if b.schema() != ours.schema() => {
            return Ok(table_conflict(tablename, "schema changed since the merge base"))
        }
        Some(b) => b.keyed_rows(tablename)?,
        None => BTreeMap::new(),
    };
    let our_rows = ours.keyed_rows(tablename)?;
    let their_rows = theirs.keyed_rows(tablename)?;

    let keys: BTreeSet<&RowKey> = base_rows
        .keys()
        .chain(our_rows.keys())
        .chain(their_rows.keys())
        .collect();

    let mut merged: Vec<Vec<Value>> = Vec::with_capacity(our_rows.len());
    let mut conflicts = Vec::new();

    for key in keys {
        let b = base_rows.get(key);
        let o = our_rows.get(key);
        let t = their_rows.get(key);

        let pick = if o == t || b == t {
            o
        } else if b == o {
            t
        } else {
            conflicts.push(MergeConflict {
                tablename: tablename.to_string(),
                key: Some(key.clone()),
                reason: "row changed differently on both sides".to_string(),
            });
            continue;
        };
        if let Some(row) = pick {
            merged.push(row.clone());
        }
    }

    if !conflicts.is_empty() {
        return Ok(TableMerge::Conflicts(conflicts));
    }
    Ok(TableMerge::Resolved(Some(Table::from_rows(
        ours.schema().clone(),
        merged,
    )?)))
}
