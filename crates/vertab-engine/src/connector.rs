//! Versioned table connector
//!
//! The façade the orchestration layer calls: `load(dataset)` and
//! `save(dataset, table)`. Each call resolves the dataset's reference, reads
//! or writes through the store, then appends a journal entry.
//!
//! ## Logging
//!
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! A failed journal append never fails the call. It is logged at warn level
//! and returned on the report as a `JournalAppendFailed` error.

use std::sync::Arc;
use std::time::Instant;

use vertab_core::diff::CommitDiff;
use vertab_core::{
    log_op_end, log_op_error, log_op_start, CommitId, CommitRecord, JournalEntry, JournalFilter,
    OpKind, Reference, Table, VertabError, VtError, VtErrorKind,
};
use vertab_core_types::schema::EVENT_JOURNAL_WARNING;
use vertab_core_types::SessionId;
use vertab_store::errors::Result;
use vertab_store::graph::{commits, resolve_tip};
use vertab_store::snapshot::table_exists;
use vertab_store::{
    diff_commits, read_table, write_table, Journal, JournalCursor, WriteOptions, WriteStatus,
};

use crate::clock::{Clock, SystemClock};
use crate::config::{CatalogConfig, DatasetConfig};
use crate::resolver::resolve_in;

/// Optional per-save settings
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Fail with `StaleWrite` unless the branch is still at this commit,
    /// typically the commit of the paired load
    pub expected_head: Option<CommitId>,
    /// Commit message; defaults to "Save table <name>"
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: Table,
    /// Commit the read was resolved against
    pub commit: CommitId,
    pub reference: Reference,
    pub journal_warning: Option<VtError>,
}

#[derive(Debug, Clone)]
pub struct SaveReport {
    pub commit: CommitId,
    /// Branch the commit is the tip of
    pub branch: String,
    pub checkout_branch: Option<String>,
    pub status: WriteStatus,
    pub dropped_rows: usize,
    pub journal_warning: Option<VtError>,
}

/// Stateless façade over a dataset catalog.
///
/// Holds no connections between calls; every call opens what it needs, so
/// one connector can serve concurrent runs that pass different sessions.
pub struct Connector {
    catalog: CatalogConfig,
    clock: Arc<dyn Clock>,
}

impl Connector {
    pub fn new(catalog: CatalogConfig) -> Self {
        Self {
            catalog,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    fn tablename_of(&self, dataset: &str) -> &str {
        self.catalog
            .get(dataset)
            .map(|c| c.tablename.as_str())
            .unwrap_or_default()
    }

    fn dataset(&self, name: &str) -> Result<&DatasetConfig> {
        let config = self.catalog.get(name)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a dataset's table as an owned copy, sorted by primary key.
    ///
    /// # Errors
    ///
    /// `TableNotFound`, `ReferenceNotFound`, `StoreUnavailable`, or a
    /// configuration error.
    pub fn load(&self, dataset: &str, session: &SessionId) -> Result<Table> {
        self.load_with_report(dataset, session).map(|r| r.table)
    }

    /// [`Connector::load`], also returning the commit read and any journal warning
    ///
    /// # Errors
    ///
    /// As [`Connector::load`].
    pub fn load_with_report(&self, dataset: &str, session: &SessionId) -> Result<LoadReport> {
        let table_name = self.tablename_of(dataset);
        log_op_start!(
            "load",
            dataset = dataset,
            table = table_name,
            session_id = session.as_str()
        );
        let start = Instant::now();

        let report = self.load_impl(dataset, session).map_err(|e| {
            log_op_error!(
                "load",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                dataset = dataset,
                table = table_name,
                session_id = session.as_str()
            );
            e
        })?;

        log_op_end!(
            "load",
            duration_ms = start.elapsed().as_millis() as u64,
            dataset = dataset,
            table = table_name,
            session_id = session.as_str(),
            commit = report.commit.as_str(),
            row_count = report.table.num_rows() as u64
        );
        Ok(report)
    }

    fn load_impl(&self, dataset: &str, session: &SessionId) -> Result<LoadReport> {
        let config = self.dataset(dataset)?;
        let store = config.location()?.open()?;
        let reference = resolve_in(&store, config)?;
        let read = read_table(&store, &reference, &config.tablename)?;
        drop(store);

        let now = self.clock.now();
        let journal_warning = self.journal(config, OpKind::Load, &read.commit, session, now.timestamp());

        Ok(LoadReport {
            table: read.table,
            commit: read.commit,
            reference,
            journal_warning,
        })
    }

    /// Save a full table value as the dataset's new state.
    ///
    /// # Errors
    ///
    /// `ImmutableReference`, `ValidationError`, `ReferenceNotFound`,
    /// `MergeConflict`, `StoreUnavailable`, or a configuration error.
    pub fn save(&self, dataset: &str, table: &Table, session: &SessionId) -> Result<()> {
        self.save_with(dataset, table, session, SaveOptions::default())
            .map(|_| ())
    }

    /// [`Connector::save`] with options, returning what the write did
    ///
    /// # Errors
    ///
    /// As [`Connector::save`], plus `StaleWrite` when `expected_head` is set
    /// and the branch moved.
    pub fn save_with(
        &self,
        dataset: &str,
        table: &Table,
        session: &SessionId,
        options: SaveOptions,
    ) -> Result<SaveReport> {
        let table_name = self.tablename_of(dataset);
        log_op_start!(
            "save",
            dataset = dataset,
            table = table_name,
            session_id = session.as_str()
        );
        let start = Instant::now();

        let report = self.save_impl(dataset, table, session, options).map_err(|e| {
            log_op_error!(
                "save",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                dataset = dataset,
                table = table_name,
                session_id = session.as_str()
            );
            e
        })?;

        log_op_end!(
            "save",
            duration_ms = start.elapsed().as_millis() as u64,
            dataset = dataset,
            table = table_name,
            session_id = session.as_str(),
            commit = report.commit.as_str(),
            status = ?report.status
        );
        Ok(report)
    }

    fn save_impl(
        &self,
        dataset: &str,
        table: &Table,
        session: &SessionId,
        options: SaveOptions,
    ) -> Result<SaveReport> {
        let config = self.dataset(dataset)?;
        let mut store = config.location()?.open()?;
        let reference = resolve_in(&store, config)?;

        if reference.is_read_only() {
            return Err(VtError::new(VtErrorKind::ImmutableReference)
                .with_op("save")
                .with_table(&config.tablename)
                .with_reference(reference.to_string())
                .with_message("Dataset is pinned to a commit; saves are not allowed"));
        }

        let keyed;
        let table = if table.schema().primary_key == config.primary_key_columns {
            table
        } else {
            keyed = table
                .clone()
                .with_primary_key(config.primary_key_columns.clone())
                .map_err(|e: VertabError| VtError::from(e).with_op("save").with_table(&config.tablename))?;
            &keyed
        };

        let now = self.clock.now();
        let write = WriteOptions {
            policy: config.branching_policy,
            mode: config.save_mode,
            checkout_branch: config.checkout_branch.clone(),
            expected_head: options.expected_head,
            message: options.message,
            session_id: Some(session.clone()),
            now_ms: now.timestamp_millis(),
        };
        let outcome = write_table(&mut store, &reference, &config.tablename, table, &write)?;
        drop(store);

        let journal_warning =
            self.journal(config, OpKind::Save, &outcome.commit, session, now.timestamp());

        Ok(SaveReport {
            commit: outcome.commit,
            branch: outcome.branch,
            checkout_branch: outcome.checkout_branch,
            status: outcome.status,
            dropped_rows: outcome.dropped_rows,
            journal_warning,
        })
    }

    /// Append a journal entry; failures come back as a warning value
    fn journal(
        &self,
        config: &DatasetConfig,
        kind: OpKind,
        commit: &CommitId,
        session: &SessionId,
        timestamp: i64,
    ) -> Option<VtError> {
        let entry = JournalEntry {
            kind,
            commit: commit.clone(),
            tablename: config.tablename.clone(),
            timestamp,
            session_id: session.clone(),
        };

        let result = open_journal(config).and_then(|journal| journal.append(&entry));
        let cause = result.err()?;

        let warning = VtError::new(VtErrorKind::JournalAppendFailed)
            .with_op(format!("journal_{}", kind))
            .with_table(&config.tablename)
            .with_commit(commit.as_str())
            .with_message(format!("Journal append failed: {}", cause.message()))
            .with_source(cause);
        tracing::warn!(
            event = EVENT_JOURNAL_WARNING,
            op = kind.as_str(),
            table = %config.tablename,
            commit = commit.as_str(),
            err_code = warning.code(),
            "Journal append failed; operation result stands"
        );
        Some(warning)
    }

    /// Whether the dataset's table exists at its reference.
    ///
    /// An uninitialised store location has no tables.
    ///
    /// # Errors
    ///
    /// `ReferenceNotFound` for a missing branch or commit.
    pub fn exists(&self, dataset: &str) -> Result<bool> {
        let config = self.dataset(dataset)?;
        let location = config.location()?;
        if !location.is_initialized() {
            return Ok(false);
        }
        let store = location.open()?;
        let reference = resolve_in(&store, config)?;
        table_exists(&store, &reference, &config.tablename)
    }

    /// Commits reachable from the dataset's reference by first parents,
    /// newest first
    ///
    /// # Errors
    ///
    /// `ReferenceNotFound` for a missing branch or commit.
    pub fn history(&self, dataset: &str, limit: usize) -> Result<Vec<CommitRecord>> {
        let config = self.dataset(dataset)?;
        let store = config.location()?.open()?;
        let reference = resolve_in(&store, config)?;
        let tip = resolve_tip(store.conn(), &reference)?;
        commits::history(store.conn(), &tip, limit)
    }

    /// Diff report between two commits of the dataset's store
    ///
    /// # Errors
    ///
    /// `ReferenceNotFound` if either commit is unknown.
    pub fn diff(&self, dataset: &str, from: &CommitId, to: &CommitId) -> Result<CommitDiff> {
        let config = self.dataset(dataset)?;
        let store = config.location()?.open()?;
        diff_commits(&store, from, to)
    }

    /// Diff report between the commits of two journal entries, older first
    ///
    /// # Errors
    ///
    /// As [`Connector::diff`].
    pub fn diff_journal(
        &self,
        dataset: &str,
        a: &JournalEntry,
        b: &JournalEntry,
    ) -> Result<CommitDiff> {
        let (older, newer) = if a.timestamp <= b.timestamp { (a, b) } else { (b, a) };
        self.diff(dataset, &older.commit, &newer.commit)
    }

    /// Lazy cursor over the dataset's journal
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a bad journal table name, `StoreUnavailable` if
    /// the journal store cannot be opened.
    pub fn journal_entries(&self, dataset: &str, filter: JournalFilter) -> Result<JournalCursor> {
        let config = self.dataset(dataset)?;
        Ok(open_journal(config)?.query(filter))
    }
}

fn open_journal(config: &DatasetConfig) -> Result<Journal> {
    let journal = config.journal_config();
    let location = match journal.store_location {
        Some(location) => location,
        None => config.location()?.clone(),
    };
    Journal::open(&location, &journal.tablename)
}
