//! Table snapshot persistence and the snapshot reader
//!
//! - `persist`: canonical snapshot → CAS blob
//! - `reader`: reference + table name → owned `Table`

pub mod persist;
pub mod reader;

pub use persist::persist_table;
pub use reader::{load_snapshot, read_table, table_exists, ReadOutcome};
