//! vertab core - in-memory kernel for versioned tables
//!
//! This crate holds everything that does not touch storage:
//! - Table model (`Table`, `Value`, `TableSchema`) and primary-key semantics
//! - Commit, reference and journal entry types
//! - Validation rules for tables and identifiers
//! - Canonical table snapshots and content digests
//! - Table diffs and three-way row merge
//! - The error and logging facilities shared by the store and engine crates

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod merge;
pub mod model;
pub mod policy;
pub mod rules;
pub mod snapshot;

pub use vertab_core_types as core_types;

pub use errors::{MergeConflict, Result, VertabError, VtError, VtErrorKind};
pub use merge::{merge_table, TableMerge};
pub use model::{
    ColumnDef, ColumnType, CommitId, CommitRecord, JournalEntry, JournalFilter, OpKind,
    Reference, RowKey, Table, TableSchema, Value,
};
pub use policy::{BranchingPolicy, SaveMode};
pub use snapshot::TableSnapshot;
