//! Canonical table snapshot schema.
//!
//! A snapshot is the row set of one table as of one commit, in a canonical
//! form: rows sorted by primary key, schema embedded. Identical row sets
//! therefore serialise to identical bytes and share one CAS blob.
//!
//! ## Schema Version
//!
//! Current snapshot schema version: **1**

use crate::errors::{Result, VertabError};
use crate::model::{Table, TableSchema, Value};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Persisted form of a table's row set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableSnapshot {
    /// Snapshot schema version (currently 1)
    pub snapshot_schema_version: u32,

    /// Column definitions and primary key
    pub schema: TableSchema,

    /// Rows in schema column order, sorted by primary key
    pub rows: Vec<Vec<Value>>,
}

impl TableSnapshot {
    /// Capture a table in canonical form.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the table is not keyed uniquely.
    pub fn from_table(tablename: &str, table: &Table) -> Result<Self> {
        let keyed = table.keyed_rows(tablename)?;
        Ok(Self {
            snapshot_schema_version: SNAPSHOT_SCHEMA_VERSION,
            schema: table.schema().clone(),
            rows: keyed.into_values().collect(),
        })
    }

    /// Materialise an owned, independent table.
    ///
    /// # Errors
    ///
    /// - `UnsupportedSnapshotVersion` for blobs from a newer format
    /// - `RowArity` if a stored row is malformed
    pub fn into_table(self) -> Result<Table> {
        if self.snapshot_schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(VertabError::UnsupportedSnapshotVersion {
                found: self.snapshot_schema_version,
            });
        }
        Table::from_rows(self.schema, self.rows)
    }

    /// Canonical serialised bytes (the CAS payload)
    ///
    /// # Errors
    ///
    /// `Serialization` if JSON encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse bytes produced by [`TableSnapshot::to_bytes`]
    ///
    /// # Errors
    ///
    /// `Serialization` if the bytes are not a snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
