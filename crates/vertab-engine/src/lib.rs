//! vertab engine - the versioned table connector
//!
//! Ties configuration, reference resolution and the store together behind a
//! two-call surface:
//!
//! - `Connector::load(dataset, session)` → owned `Table`
//! - `Connector::save(dataset, table, session)`
//!
//! Both operations are journaled. Saves commit according to the dataset's
//! branching policy.

#![allow(clippy::result_large_err)]

pub mod clock;
pub mod config;
pub mod connector;
pub mod resolver;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CatalogConfig, DatasetConfig, JournalConfig, DEFAULT_JOURNAL_TABLE};
pub use connector::{Connector, LoadReport, SaveOptions, SaveReport};
pub use resolver::{resolve, resolve_in};
