use crate::errors::{Result, VertabError};
use crate::model::Table;
use std::collections::HashSet;

/// Validate a table before it is committed.
///
/// The store is stricter than the in-memory representation, so every row is
/// checked against the declared schema:
///
/// 1. Schema structure (unique columns, non-empty key naming real columns)
/// 2. Every non-null cell matches its column type
/// 3. Null only in nullable, non-key columns
/// 4. Primary keys are unique
///
/// Checks run over the whole table before anything is written; the first
/// violation rejects the table as a whole.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_table(tablename: &str, table: &Table) -> Result<()> {
    let schema = table.schema();
    schema.check()?;

    for def in &schema.columns {
        let is_key = schema.is_key_column(&def.name);
        for value in table.column(&def.name).unwrap_or_default() {
            match value.column_type() {
                None if is_key || !def.nullable => {
                    return Err(VertabError::NullValue {
                        column: def.name.clone(),
                    });
                }
                None => {}
                Some(ty) if ty != def.column_type => {
                    return Err(VertabError::TypeMismatch {
                        column: def.name.clone(),
                        expected: def.column_type.to_string(),
                        found: ty.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    let mut seen = HashSet::with_capacity(table.num_rows());
    for row in 0..table.num_rows() {
        let key = table.key_of(row)?;
        if seen.contains(&key) {
            return Err(VertabError::DuplicateKey {
                tablename: tablename.to_string(),
                key,
            });
        }
        seen.insert(key);
    }

    Ok(())
}
