//! In-memory tables.
//!
//! A [`Table`] is stored column-wise: one value vector per schema column, all
//! of equal length. Tables are plain owned values; a table returned by a load
//! is a disconnected copy that callers may mutate freely.
//!
//! Row order carries no meaning. Two tables compare equal when their schemas
//! match and they hold the same rows keyed by primary key.

use crate::errors::{Result, VertabError};
use crate::model::schema::TableSchema;
use crate::model::value::Value;
use std::collections::BTreeMap;

/// Primary-key value tuple identifying one row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(pub Vec<Value>);

impl RowKey {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str(")")
    }
}

/// Column-oriented table with an explicit primary key
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    columns: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table
    pub fn new(schema: TableSchema) -> Self {
        let columns = vec![Vec::new(); schema.width()];
        Self { schema, columns }
    }

    /// Build a table from row tuples in schema column order.
    ///
    /// # Errors
    ///
    /// `RowArity` if any row width differs from the schema.
    pub fn from_rows(schema: TableSchema, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(schema);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from whole columns in schema column order.
    ///
    /// # Errors
    ///
    /// - `RowArity` if the number of columns differs from the schema
    /// - `ColumnLength` if the columns are ragged
    pub fn from_columns(schema: TableSchema, columns: Vec<Vec<Value>>) -> Result<Self> {
        if columns.len() != schema.width() {
            return Err(VertabError::RowArity {
                expected: schema.width(),
                found: columns.len(),
            });
        }
        let expected = columns.first().map(Vec::len).unwrap_or(0);
        for (def, values) in schema.columns.iter().zip(&columns) {
            if values.len() != expected {
                return Err(VertabError::ColumnLength {
                    column: def.name.clone(),
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(Self { schema, columns })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// All values of one column, by name
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.schema
            .index_of(name)
            .map(|i| self.columns[i].as_slice())
    }

    /// One row as an owned tuple
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[index].clone()).collect())
    }

    /// Iterate rows as owned tuples
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.num_rows()).map(move |i| self.columns.iter().map(|c| c[i].clone()).collect())
    }

    /// Append a row tuple in schema column order.
    ///
    /// # Errors
    ///
    /// `RowArity` if the tuple width differs from the schema.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.schema.width() {
            return Err(VertabError::RowArity {
                expected: self.schema.width(),
                found: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(())
    }

    /// Append a row given as column name/value pairs.
    ///
    /// Columns not mentioned are filled with null.
    ///
    /// # Errors
    ///
    /// `UnknownColumn` if a pair names a column the schema lacks.
    pub fn append_record<I, K, V>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut row = vec![Value::Null; self.schema.width()];
        for (name, value) in record {
            let idx = self
                .schema
                .index_of(name.as_ref())
                .ok_or_else(|| VertabError::UnknownColumn {
                    column: name.as_ref().to_string(),
                })?;
            row[idx] = value.into();
        }
        self.push_row(row)
    }

    /// Primary-key tuple of the row at `index`
    ///
    /// # Errors
    ///
    /// - `RowOutOfRange` if `index` is not a row of this table
    /// - `MissingKeyColumn` if the schema key is inconsistent
    pub fn key_of(&self, index: usize) -> Result<RowKey> {
        if index >= self.num_rows() {
            return Err(VertabError::RowOutOfRange {
                index,
                rows: self.num_rows(),
            });
        }
        let indices = self.schema.key_indices()?;
        Ok(RowKey(
            indices
                .iter()
                .map(|&i| self.columns[i][index].clone())
                .collect(),
        ))
    }

    /// Rows keyed by primary key.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if two rows share a key.
    pub fn keyed_rows(&self, tablename: &str) -> Result<BTreeMap<RowKey, Vec<Value>>> {
        let indices = self.schema.key_indices()?;
        let mut keyed = BTreeMap::new();
        for row in self.rows() {
            let key = RowKey(indices.iter().map(|&i| row[i].clone()).collect());
            if keyed.contains_key(&key) {
                return Err(VertabError::DuplicateKey {
                    tablename: tablename.to_string(),
                    key,
                });
            }
            keyed.insert(key, row);
        }
        Ok(keyed)
    }

    /// Replace the primary-key column set.
    ///
    /// # Errors
    ///
    /// `EmptyPrimaryKey` / `MissingKeyColumn` if the new key is unusable.
    pub fn with_primary_key(mut self, primary_key: Vec<String>) -> Result<Self> {
        self.schema.primary_key = primary_key;
        self.schema.check()?;
        Ok(self)
    }

    /// Replace `Float(NaN)` cells with `Null`; returns how many were replaced.
    pub fn nan_to_null(&mut self) -> usize {
        let mut replaced = 0;
        for cell in self.columns.iter_mut().flatten() {
            if cell.is_nan() {
                *cell = Value::Null;
                replaced += 1;
            }
        }
        replaced
    }

    /// Remove rows with a null in any key column; returns how many were dropped.
    ///
    /// # Errors
    ///
    /// `MissingKeyColumn` if the schema key is inconsistent.
    pub fn drop_null_key_rows(&mut self) -> Result<usize> {
        let indices = self.schema.key_indices()?;
        let keep: Vec<bool> = (0..self.num_rows())
            .map(|row| !indices.iter().any(|&i| self.columns[i][row].is_null()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            for column in &mut self.columns {
                let mut flags = keep.iter();
                column.retain(|_| *flags.next().unwrap_or(&true));
            }
        }
        Ok(dropped)
    }

    /// Sort rows in place by primary key
    ///
    /// # Errors
    ///
    /// `MissingKeyColumn` if the schema key is inconsistent.
    pub fn sort_by_key(&mut self) -> Result<()> {
        let indices = self.schema.key_indices()?;
        let mut rows: Vec<Vec<Value>> = self.rows().collect();
        rows.sort_by(|a, b| {
            let ka = indices.iter().map(|&i| &a[i]);
            let kb = indices.iter().map(|&i| &b[i]);
            ka.cmp(kb).then_with(|| a.cmp(b))
        });
        let mut sorted = Table::new(self.schema.clone());
        for row in rows {
            sorted.push_row(row)?;
        }
        *self = sorted;
        Ok(())
    }

    /// Key-based set equality: same schema, same rows per key, order ignored.
    ///
    /// Tables holding duplicate keys fall back to comparing sorted row lists.
    pub fn same_rows_as(&self, other: &Table) -> bool {
        if self.schema != other.schema || self.num_rows() != other.num_rows() {
            return false;
        }
        match (self.keyed_rows(""), other.keyed_rows("")) {
            (Ok(a), Ok(b)) => a == b,
            _ => {
                let mut a: Vec<_> = self.rows().collect();
                let mut b: Vec<_> = other.rows().collect();
                a.sort();
                b.sort();
                a == b
            }
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.same_rows_as(other)
    }
}
