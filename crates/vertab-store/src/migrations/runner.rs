//! Migration runner
//!
//! Applies pending migrations in order inside one IMMEDIATE transaction and
//! rejects a store whose recorded checksum differs from the embedded SQL.
//! The write lock is taken before `schema_version` is read, so concurrent
//! first opens of a fresh store apply each migration exactly once.

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::get_migrations;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

/// Apply all pending migrations to the database
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;
    create_schema_version_table(&tx)?;

    let mut applied = 0;
    for migration in get_migrations() {
        if apply_migration(&tx, migration.id, migration.sql)? {
            applied += 1;
        }
    }
    tx.commit().map_err(from_rusqlite)?;

    if applied > 0 {
        tracing::debug!(applied, "Applied migrations");
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT
        )",
        [],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Returns whether the migration ran
fn apply_migration(conn: &Connection, migration_id: &str, sql: &str) -> Result<bool> {
    let checksum = compute_checksum(sql);

    let recorded: Option<Option<String>> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?",
            [migration_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    match recorded {
        Some(Some(existing)) if existing != checksum => {
            return Err(checksum_mismatch(migration_id, &existing, &checksum));
        }
        Some(_) => return Ok(false),
        None => {}
    }

    conn.execute_batch(sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;
    conn.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?, ?, ?)",
        rusqlite::params![migration_id, chrono::Utc::now().timestamp(), checksum],
    )
    .map_err(from_rusqlite)?;

    tracing::debug!(migration_id, "Applied migration");
    Ok(true)
}
