//! Commit diff output types.
//!
//! Collections are sorted by table name for deterministic serialization.

use crate::model::CommitId;
use serde::{Deserialize, Serialize};

/// Per-table row and cell statistics between two commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitDiff {
    /// Schema version of this diff structure (always 1)
    pub diff_schema_version: u32,
    pub from: CommitId,
    pub to: CommitId,
    /// One entry per table present in either commit, sorted by name
    pub tables: Vec<TableDiffSummary>,
}

impl CommitDiff {
    pub fn new(from: CommitId, to: CommitId, mut tables: Vec<TableDiffSummary>) -> Self {
        tables.sort_by(|a, b| a.tablename.cmp(&b.tablename));
        Self {
            diff_schema_version: 1,
            from,
            to,
            tables,
        }
    }

    /// Whether any table differs
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(|t| t.status == TableChange::Unchanged)
    }

    pub fn table(&self, tablename: &str) -> Option<&TableDiffSummary> {
        self.tables.iter().find(|t| t.tablename == tablename)
    }
}

/// How a table's presence changed between two commits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableChange {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl TableChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableChange::Added => "added",
            TableChange::Removed => "removed",
            TableChange::Modified => "modified",
            TableChange::Unchanged => "unchanged",
        }
    }
}

/// Row/cell counts for one table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDiffSummary {
    pub tablename: String,
    pub status: TableChange,
    pub schema_changed: bool,
    pub rows_unmodified: u64,
    pub rows_added: u64,
    pub rows_deleted: u64,
    pub rows_modified: u64,
    /// Differing cells across modified rows
    pub cells_modified: u64,
    /// Row count in the older commit
    pub entries_before: u64,
    /// Row count in the newer commit
    pub entries_after: u64,
}

impl TableDiffSummary {
    /// Summary for a table whose snapshot digest did not change
    pub fn unchanged(tablename: impl Into<String>, rows: u64) -> Self {
        Self {
            tablename: tablename.into(),
            status: TableChange::Unchanged,
            schema_changed: false,
            rows_unmodified: rows,
            rows_added: 0,
            rows_deleted: 0,
            rows_modified: 0,
            cells_modified: 0,
            entries_before: rows,
            entries_after: rows,
        }
    }
}
