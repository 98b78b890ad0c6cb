//! Commit arena

use crate::errors::{reference_not_found, sqlite_op, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashSet, VecDeque};
use vertab_core::{CommitId, CommitRecord, VtError, VtErrorKind};

/// Minimum length of an abbreviated commit id
pub const MIN_PREFIX_LEN: usize = 7;

/// Insert a commit with its parents and table digests.
///
/// Commits are content-addressed, so inserting an existing id is a no-op.
pub fn insert_commit(conn: &Connection, record: &CommitRecord) -> Result<()> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO commits (commit_id, message, created_at, session_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.commit_id.as_str(),
                record.message,
                record.created_at,
                record.session_id
            ],
        )
        .map_err(sqlite_op("insert_commit"))?;
    if inserted == 0 {
        return Ok(());
    }

    for (ordinal, parent) in record.parents.iter().enumerate() {
        conn.execute(
            "INSERT INTO commit_parents (commit_id, parent_id, ordinal) VALUES (?1, ?2, ?3)",
            params![record.commit_id.as_str(), parent.as_str(), ordinal as i64],
        )
        .map_err(sqlite_op("insert_commit_parent"))?;
    }
    for (tablename, digest) in &record.tables {
        conn.execute(
            "INSERT INTO commit_tables (commit_id, tablename, snapshot_digest) VALUES (?1, ?2, ?3)",
            params![record.commit_id.as_str(), tablename, digest],
        )
        .map_err(sqlite_op("insert_commit_table"))?;
    }

    tracing::debug!(
        commit = %record.commit_id,
        parents = record.parents.len(),
        tables = record.tables.len(),
        "Inserted commit"
    );
    Ok(())
}

pub fn get_commit(conn: &Connection, id: &CommitId) -> Result<Option<CommitRecord>> {
    let header = conn
        .query_row(
            "SELECT message, created_at, session_id FROM commits WHERE commit_id = ?1",
            [id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()
        .map_err(sqlite_op("get_commit"))?;

    let Some((message, created_at, session_id)) = header else {
        return Ok(None);
    };

    Ok(Some(CommitRecord {
        commit_id: id.clone(),
        parents: parents(conn, id)?,
        tables: tables(conn, id)?,
        message,
        created_at,
        session_id,
    }))
}

/// Like [`get_commit`], but a missing commit is `ReferenceNotFound`
pub fn require_commit(conn: &Connection, id: &CommitId) -> Result<CommitRecord> {
    get_commit(conn, id)?.ok_or_else(|| reference_not_found(id.as_str()))
}

pub fn parents(conn: &Connection, id: &CommitId) -> Result<Vec<CommitId>> {
    let mut stmt = conn
        .prepare("SELECT parent_id FROM commit_parents WHERE commit_id = ?1 ORDER BY ordinal")
        .map_err(sqlite_op("get_parents"))?;
    let rows = stmt
        .query_map([id.as_str()], |row| row.get::<_, String>(0))
        .map_err(sqlite_op("get_parents"))?
        .map(|r| r.map(CommitId::new))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("get_parents"))?;
    Ok(rows)
}

fn tables(conn: &Connection, id: &CommitId) -> Result<BTreeMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT tablename, snapshot_digest FROM commit_tables WHERE commit_id = ?1")
        .map_err(sqlite_op("get_commit_tables"))?;
    let rows = stmt
        .query_map([id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(sqlite_op("get_commit_tables"))?
        .collect::<std::result::Result<BTreeMap<_, _>, _>>()
        .map_err(sqlite_op("get_commit_tables"))?;
    Ok(rows)
}

/// Expand a full or abbreviated commit id.
///
/// # Errors
///
/// - `InvalidInput` if the prefix is too short or ambiguous
/// - `ReferenceNotFound` if nothing matches
pub fn find_commit(conn: &Connection, prefix: &str) -> Result<CommitId> {
    if prefix.len() < MIN_PREFIX_LEN || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VtError::new(VtErrorKind::InvalidInput)
            .with_op("find_commit")
            .with_commit(prefix)
            .with_message(format!(
                "Commit id must be at least {} hex characters",
                MIN_PREFIX_LEN
            )));
    }

    let mut stmt = conn
        .prepare("SELECT commit_id FROM commits WHERE commit_id LIKE ?1 || '%' LIMIT 2")
        .map_err(sqlite_op("find_commit"))?;
    let matches = stmt
        .query_map([prefix.to_ascii_lowercase()], |row| row.get::<_, String>(0))
        .map_err(sqlite_op("find_commit"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(sqlite_op("find_commit"))?;

    match matches.as_slice() {
        [] => Err(reference_not_found(prefix)),
        [one] => Ok(CommitId::new(one.clone())),
        _ => Err(VtError::new(VtErrorKind::InvalidInput)
            .with_op("find_commit")
            .with_commit(prefix)
            .with_message("Ambiguous commit id prefix")),
    }
}

/// Walk first parents from `from`, newest first, at most `limit` commits
pub fn history(conn: &Connection, from: &CommitId, limit: usize) -> Result<Vec<CommitRecord>> {
    let mut out = Vec::new();
    let mut next = Some(from.clone());
    while let Some(id) = next {
        if out.len() >= limit {
            break;
        }
        let record = require_commit(conn, &id)?;
        next = record.first_parent().cloned();
        out.push(record);
    }
    Ok(out)
}

/// Whether `ancestor` is reachable from `descendant` (inclusive)
pub fn is_ancestor(conn: &Connection, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([descendant.clone()]);
    while let Some(id) = queue.pop_front() {
        if &id == ancestor {
            return Ok(true);
        }
        if seen.insert(id.clone()) {
            queue.extend(parents(conn, &id)?);
        }
    }
    Ok(false)
}

/// Nearest common ancestor of two commits (breadth-first from `b`)
pub fn merge_base(conn: &Connection, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>> {
    let mut ancestors_of_a = HashSet::new();
    let mut queue = VecDeque::from([a.clone()]);
    while let Some(id) = queue.pop_front() {
        if ancestors_of_a.insert(id.clone()) {
            queue.extend(parents(conn, &id)?);
        }
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([b.clone()]);
    while let Some(id) = queue.pop_front() {
        if ancestors_of_a.contains(&id) {
            return Ok(Some(id));
        }
        if seen.insert(id.clone()) {
            queue.extend(parents(conn, &id)?);
        }
    }
    Ok(None)
}
