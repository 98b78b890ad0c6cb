//! Table schemas.

use crate::errors::{Result, VertabError};
use crate::model::value::ColumnType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Definition of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    /// Whether non-key cells may be null. Key columns never accept null.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDef {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// Create a column that rejects null
    pub fn required(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }
}

/// Ordered column definitions plus the primary-key column set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Build a schema, checking column names and primary key.
    ///
    /// # Errors
    ///
    /// - `DuplicateColumn` if two columns share a name
    /// - `EmptyPrimaryKey` if no key column is named
    /// - `MissingKeyColumn` if a key column is not among the columns
    pub fn new(columns: Vec<ColumnDef>, primary_key: Vec<String>) -> Result<Self> {
        let schema = Self {
            columns,
            primary_key,
        };
        schema.check()?;
        Ok(schema)
    }

    /// Re-run the structural checks performed by [`TableSchema::new`].
    ///
    /// # Errors
    ///
    /// Same as [`TableSchema::new`].
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(VertabError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
        }

        if self.primary_key.is_empty() {
            return Err(VertabError::EmptyPrimaryKey);
        }

        let mut key_seen = HashSet::new();
        for key in &self.primary_key {
            if !seen.contains(key.as_str()) {
                return Err(VertabError::MissingKeyColumn {
                    column: key.clone(),
                });
            }
            if !key_seen.insert(key.as_str()) {
                return Err(VertabError::DuplicateColumn {
                    column: key.clone(),
                });
            }
        }

        Ok(())
    }

    /// Position of a column by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Positions of the primary-key columns, in key order
    ///
    /// # Errors
    ///
    /// `MissingKeyColumn` if the key names a column the schema lacks.
    pub fn key_indices(&self) -> Result<Vec<usize>> {
        self.primary_key
            .iter()
            .map(|k| {
                self.index_of(k)
                    .ok_or_else(|| VertabError::MissingKeyColumn { column: k.clone() })
            })
            .collect()
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}
