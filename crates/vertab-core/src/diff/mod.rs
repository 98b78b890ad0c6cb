//! Commit diff reporting.
//!
//! ```ignore
//! let summary = vertab_core::diff::diff_tables("scooters", Some(&before), Some(&after))?;
//! let report = CommitDiff::new(from, to, vec![summary]);
//! println!("{}", vertab_core::diff::render_diff_summary(&report));
//! ```
//!
//! Identical inputs produce identical reports; table order is by name.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::diff_tables;
pub use human_summary::render_diff_summary;
pub use model::{CommitDiff, TableChange, TableDiffSummary};
