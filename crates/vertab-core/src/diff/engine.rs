//! Row-level comparison of two table states.

use crate::diff::model::{TableChange, TableDiffSummary};
use crate::errors::Result;
use crate::model::{RowKey, Table, Value};
use std::collections::BTreeMap;

/// Compare two states of one table.
///
/// `None` means the table does not exist on that side. Rows are matched by
/// primary key; when the key columns themselves differ, every row counts as
/// deleted and re-added. Cells are compared by column name, so a column
/// present on one side only reads as `NULL` on the other.
///
/// # Errors
///
/// `DuplicateKey` if either side is not uniquely keyed.
pub fn diff_tables(
    tablename: &str,
    before: Option<&Table>,
    after: Option<&Table>,
) -> Result<TableDiffSummary> {
    let before_rows = before.map(|t| t.num_rows() as u64).unwrap_or(0);
    let after_rows = after.map(|t| t.num_rows() as u64).unwrap_or(0);

    let mut summary = TableDiffSummary {
        tablename: tablename.to_string(),
        status: TableChange::Unchanged,
        schema_changed: false,
        rows_unmodified: 0,
        rows_added: 0,
        rows_deleted: 0,
        rows_modified: 0,
        cells_modified: 0,
        entries_before: before_rows,
        entries_after: after_rows,
    };

    let (old, new) = match (before, after) {
        (None, None) => return Ok(summary),
        (None, Some(_)) => {
            summary.status = TableChange::Added;
            summary.schema_changed = true;
            summary.rows_added = after_rows;
            return Ok(summary);
        }
        (Some(_), None) => {
            summary.status = TableChange::Removed;
            summary.schema_changed = true;
            summary.rows_deleted = before_rows;
            return Ok(summary);
        }
        (Some(old), Some(new)) => (old, new),
    };

    summary.schema_changed = old.schema() != new.schema();

    if old.schema().primary_key != new.schema().primary_key {
        summary.rows_deleted = before_rows;
        summary.rows_added = after_rows;
    } else {
        let old_rows = by_name(old, tablename)?;
        let new_rows = by_name(new, tablename)?;

        for (key, old_row) in &old_rows {
            match new_rows.get(key) {
                None => summary.rows_deleted += 1,
                Some(new_row) => {
                    let cells = changed_cells(old_row, new_row);
                    if cells == 0 {
                        summary.rows_unmodified += 1;
                    } else {
                        summary.rows_modified += 1;
                        summary.cells_modified += cells;
                    }
                }
            }
        }
        summary.rows_added = new_rows
            .keys()
            .filter(|k| !old_rows.contains_key(*k))
            .count() as u64;
    }

    if summary.schema_changed
        || summary.rows_added > 0
        || summary.rows_deleted > 0
        || summary.rows_modified > 0
    {
        summary.status = TableChange::Modified;
    }
    Ok(summary)
}

type NamedRow = BTreeMap<String, Value>;

fn by_name(table: &Table, tablename: &str) -> Result<BTreeMap<RowKey, NamedRow>> {
    let names = table.schema().column_names();
    Ok(table
        .keyed_rows(tablename)?
        .into_iter()
        .map(|(key, row)| {
            let named = names
                .iter()
                .map(|n| n.to_string())
                .zip(row)
                .collect::<NamedRow>();
            (key, named)
        })
        .collect())
}

fn changed_cells(old: &NamedRow, new: &NamedRow) -> u64 {
    let mut count = 0;
    for (name, value) in old {
        if new.get(name).unwrap_or(&Value::Null) != value {
            count += 1;
        }
    }
    for (name, value) in new {
        if !old.contains_key(name) && !value.is_null() {
            count += 1;
        }
    }
    count
}
