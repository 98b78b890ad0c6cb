//! Reference (branch) storage

use crate::errors::{reference_not_found, sqlite_op, Result};
use rusqlite::{params, Connection, OptionalExtension};
use vertab_core::{CommitId, VtError, VtErrorKind};

pub fn get_ref(conn: &Connection, name: &str) -> Result<Option<CommitId>> {
    conn.query_row(
        "SELECT commit_id FROM refs WHERE name = ?1",
        [name],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map(|id| id.map(CommitId::new))
    .map_err(sqlite_op("get_ref"))
}

/// Create a branch.
///
/// # Errors
///
/// `AlreadyExists` if the name is taken.
pub fn create_ref(conn: &Connection, name: &str, commit: &CommitId, now_ms: i64) -> Result<()> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO refs (name, commit_id, updated_at) VALUES (?1, ?2, ?3)",
            params![name, commit.as_str(), now_ms],
        )
        .map_err(sqlite_op("create_ref"))?;

    if inserted == 0 {
        return Err(VtError::new(VtErrorKind::AlreadyExists)
            .with_op("create_ref")
            .with_reference(name)
            .with_message(format!("Reference '{}' already exists", name)));
    }
    tracing::debug!(reference = name, commit = %commit, "Created reference");
    Ok(())
}

/// Move a branch from `expected` to `new` (compare-and-set).
///
/// # Errors
///
/// - `ReferenceNotFound` if the branch is gone
/// - `StaleWrite` if it no longer points at `expected`
pub fn advance_ref(
    conn: &Connection,
    name: &str,
    expected: &CommitId,
    new: &CommitId,
    now_ms: i64,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE refs SET commit_id = ?1, updated_at = ?2 WHERE name = ?3 AND commit_id = ?4",
            params![new.as_str(), now_ms, name, expected.as_str()],
        )
        .map_err(sqlite_op("advance_ref"))?;

    if updated == 0 {
        return match get_ref(conn, name)? {
            None => Err(reference_not_found(name)),
            Some(actual) => Err(VtError::new(VtErrorKind::StaleWrite)
                .with_op("advance_ref")
                .with_reference(name)
                .with_commit(actual.as_str())
                .with_message(format!(
                    "Reference '{}' moved: expected {}, found {}",
                    name,
                    expected.short(),
                    actual.short()
                ))),
        };
    }
    tracing::debug!(reference = name, from = %expected.short(), to = %new.short(), "Advanced reference");
    Ok(())
}

/// All references, sorted by name
pub fn list_refs(conn: &Connection) -> Result<Vec<(String, CommitId)>> {
    let mut stmt = conn
        .prepare("SELECT name, commit_id FROM refs ORDER BY name")
        .map_err(sqlite_op("list_refs"))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, CommitId::new(row.get::<_, String>(1)?)))
        })
        .map_err(sqlite_op("list_refs"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("list_refs"))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{root_commit, StoreLocation};
    use tempfile::TempDir;

    #[test]
    fn test_advance_is_compare_and_set() {
        let dir = TempDir::new().unwrap();
        let store = StoreLocation::new(dir.path()).open().unwrap();
        let root = root_commit().unwrap().commit_id;
        let bogus = CommitId::new("f".repeat(64));

        let err = advance_ref(store.conn(), "main", &bogus, &root, 5).unwrap_err();
        assert_eq!(err.kind(), VtErrorKind::StaleWrite);

        let err = advance_ref(store.conn(), "nope", &root, &root, 5).unwrap_err();
        assert_eq!(err.kind(), VtErrorKind::ReferenceNotFound);
    }

    #[test]
    fn test_create_duplicate_ref() {
        let dir = TempDir::new().unwrap();
        let store = StoreLocation::new(dir.path()).open().unwrap();
        let root = root_commit().unwrap().commit_id;

        let err = create_ref(store.conn(), "main", &root, 1).unwrap_err();
        assert_eq!(err.kind(), VtErrorKind::AlreadyExists);
    }
}
