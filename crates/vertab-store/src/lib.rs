//! vertab store - persistence for versioned tables
//!
//! Provides:
//! - SQLite commit graph and references with a checksummed migration runner
//! - Content-addressable storage (CAS) for canonical table snapshots
//! - Snapshot reader and writer (branching policies, save modes, merges)
//! - The commit journal
//! - Commit diff reports

#![allow(clippy::result_large_err)]

pub mod cas;
pub mod db;
pub mod diff;
pub mod errors;
pub mod graph;
pub mod journal;
pub mod location;
pub mod migrations;
pub mod snapshot;
pub mod writer;

pub use diff::diff_commits;
pub use errors::Result;
pub use journal::{Journal, JournalCursor};
pub use location::{Store, StoreLocation, MAIN_BRANCH};
pub use snapshot::{read_table, ReadOutcome};
pub use writer::{write_table, WriteOptions, WriteOutcome, WriteStatus};
