//! Commit journal
//!
//! An append-only SQLite table of load/save records. The table name is
//! configurable, so it is validated as a plain identifier before any DDL is
//! issued. The journal is not versioned: appends never create commits.

use crate::db;
use crate::errors::{io_error, sqlite_op, Result};
use crate::location::StoreLocation;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::VecDeque;
use vertab_core::rules::validate_journal_table;
use vertab_core::{CommitId, JournalEntry, JournalFilter, OpKind, VtError, VtErrorKind};
use vertab_core_types::SessionId;

const PAGE_SIZE: i64 = 256;

/// Handle to one journal table
pub struct Journal {
    conn: Connection,
    location: StoreLocation,
    tablename: String,
}

impl Journal {
    /// Open the journal table, creating it if missing.
    ///
    /// ## Errors
    ///
    /// - `InvalidInput`: the table name is not a safe identifier or is reserved
    /// - `StoreUnavailable`: the database could not be opened
    pub fn open(location: &StoreLocation, tablename: &str) -> Result<Self> {
        validate_journal_table(tablename).map_err(|e| VtError::from(e).with_op("open_journal"))?;
        std::fs::create_dir_all(location.path()).map_err(|e| io_error("create_store_dir", e))?;

        let conn = db::open(location.db_path())?;
        conn.execute_batch(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{t}" (
                kind TEXT NOT NULL CHECK (kind IN ('load', 'save')),
                "commit" TEXT NOT NULL,
                tablename TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                session_id TEXT NOT NULL,
                PRIMARY KEY (kind, "commit", tablename, timestamp, session_id)
            );
            CREATE INDEX IF NOT EXISTS "idx_{t}_tablename" ON "{t}" (tablename);"#,
            t = tablename
        ))
        .map_err(sqlite_op("create_journal"))?;

        Ok(Self {
            conn,
            location: location.clone(),
            tablename: tablename.to_string(),
        })
    }

    pub fn tablename(&self) -> &str {
        &self.tablename
    }

    /// Append an entry. An exact duplicate is silently ignored; returns
    /// whether a new row was stored.
    pub fn append(&self, entry: &JournalEntry) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                &format!(
                    r#"INSERT OR IGNORE INTO "{}" (kind, "commit", tablename, timestamp, session_id)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    self.tablename
                ),
                params![
                    entry.kind.as_str(),
                    entry.commit.as_str(),
                    entry.tablename,
                    entry.timestamp,
                    entry.session_id.as_str()
                ],
            )
            .map_err(sqlite_op("journal_append"))?;

        tracing::debug!(
            journal = %self.tablename,
            kind = %entry.kind,
            table = %entry.tablename,
            commit = %entry.commit.short(),
            inserted = inserted > 0,
            "Journal append"
        );
        Ok(inserted > 0)
    }

    /// Lazily query entries matching `filter`.
    ///
    /// Nothing is read until the cursor is iterated. Order is unspecified;
    /// sort by timestamp if it matters.
    pub fn query(&self, filter: JournalFilter) -> JournalCursor {
        JournalCursor {
            location: self.location.clone(),
            tablename: self.tablename.clone(),
            filter,
            conn: None,
            buffer: VecDeque::new(),
            last_rowid: 0,
            exhausted: false,
        }
    }
}

/// Restartable cursor over journal rows, fetched a page at a time
pub struct JournalCursor {
    location: StoreLocation,
    tablename: String,
    filter: JournalFilter,
    conn: Option<Connection>,
    buffer: VecDeque<JournalEntry>,
    last_rowid: i64,
    exhausted: bool,
}

impl JournalCursor {
    /// Start again from the first row; entries appended since are included
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.last_rowid = 0;
        self.exhausted = false;
    }

    fn fetch_page(&mut self) -> Result<()> {
        if self.conn.is_none() {
            self.conn = Some(db::open(self.location.db_path())?);
        }
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };

        let mut sql = format!(
            r#"SELECT rowid, kind, "commit", tablename, timestamp, session_id FROM "{}" WHERE rowid > ?"#,
            self.tablename
        );
        let mut args = vec![SqlValue::Integer(self.last_rowid)];
        let f = &self.filter;
        if let Some(kind) = f.kind {
            sql.push_str(" AND kind = ?");
            args.push(SqlValue::Text(kind.as_str().to_string()));
        }
        if let Some(commit) = &f.commit {
            sql.push_str(r#" AND "commit" = ?"#);
            args.push(SqlValue::Text(commit.as_str().to_string()));
        }
        if let Some(tablename) = &f.tablename {
            sql.push_str(" AND tablename = ?");
            args.push(SqlValue::Text(tablename.clone()));
        }
        if let Some(session) = &f.session_id {
            sql.push_str(" AND session_id = ?");
            args.push(SqlValue::Text(session.as_str().to_string()));
        }
        if let Some(since) = f.since {
            sql.push_str(" AND timestamp >= ?");
            args.push(SqlValue::Integer(since));
        }
        if let Some(until) = f.until {
            sql.push_str(" AND timestamp <= ?");
            args.push(SqlValue::Integer(until));
        }
        sql.push_str(" ORDER BY rowid LIMIT ?");
        args.push(SqlValue::Integer(PAGE_SIZE));

        let mut stmt = conn.prepare(&sql).map_err(sqlite_op("journal_query"))?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(sqlite_op("journal_query"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite_op("journal_query"))?;

        if (rows.len() as i64) < PAGE_SIZE {
            self.exhausted = true;
        }
        for (rowid, kind, commit, tablename, timestamp, session_id) in rows {
            self.last_rowid = rowid;
            let kind = OpKind::parse(&kind).ok_or_else(|| {
                VtError::new(VtErrorKind::Persistence)
                    .with_op("journal_query")
                    .with_message(format!("Unknown journal kind '{}'", kind))
            })?;
            self.buffer.push_back(JournalEntry {
                kind,
                commit: CommitId::new(commit),
                tablename,
                timestamp,
                session_id: SessionId::from_string(session_id),
            });
        }
        Ok(())
    }
}

impl Iterator for JournalCursor {
    type Item = Result<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}
