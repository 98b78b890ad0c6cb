//! Snapshot writer
//!
//! Turns a full table value into a new immutable commit and moves references
//! according to the branching policy. Each commit and its reference update
//! share one SQLite transaction: either both land or neither does.

use crate::cas::FsStore;
use crate::errors::{from_rusqlite, reference_not_found, Result};
use crate::graph::{commits, refs};
use crate::location::Store;
use crate::snapshot::{load_snapshot, persist_table};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use vertab_core::rules::{validate_branch_name, validate_identifier, validate_table};
use vertab_core::snapshot::compute_commit_id;
use vertab_core::{
    merge_table, BranchingPolicy, CommitId, CommitRecord, Reference, SaveMode, Table, TableMerge,
    VertabError, VtError, VtErrorKind,
};
use vertab_core_types::SessionId;

/// Per-write settings
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub policy: BranchingPolicy,
    pub mode: SaveMode,
    /// Name prefix of the branch forked by checkout policies. Every fork
    /// gets a unique suffix; `None` forks `<branch>-checkout-<id>`.
    pub checkout_branch: Option<String>,
    /// Reject the write with `StaleWrite` unless the branch still points here
    pub expected_head: Option<CommitId>,
    pub message: Option<String>,
    pub session_id: Option<SessionId>,
    /// Commit and reference timestamp, milliseconds since epoch
    pub now_ms: i64,
}

/// What a successful write did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// A new commit was created on the target branch
    Committed,
    /// The table already had this content; no commit was created
    Unchanged,
    /// The checkout branch was fast-forwarded into the original branch
    FastForwarded,
    /// A two-parent merge commit was created on the original branch
    Merged,
}

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    /// Commit now holding the written table state
    pub commit: CommitId,
    /// Branch the commit is the tip of
    pub branch: String,
    /// Forked branch, for checkout policies
    pub checkout_branch: Option<String>,
    pub status: WriteStatus,
    /// Rows discarded because a key cell was null
    pub dropped_rows: usize,
}

impl WriteOutcome {
    pub fn created_commit(&self) -> bool {
        self.status != WriteStatus::Unchanged
    }
}

/// Write a table through a reference.
///
/// `NaN` cells become null and rows with a null key cell are dropped, then
/// every remaining row is validated before anything is persisted. A table identical to the one at
/// the parent commit produces no commit; the parent is returned instead,
/// which makes resubmitting a write that already landed harmless.
///
/// ## Errors
///
/// - `ImmutableReference`: the reference is a pinned commit (checked first)
/// - `ValidationError`: type, null or duplicate-key violation; nothing written
/// - `ReferenceNotFound`: the branch no longer exists
/// - `StaleWrite`: `expected_head` given and the branch moved
/// - `MergeConflict`: `CheckoutAndMerge` could not merge; the original
///   branch is untouched and the checkout branch keeps the new commit
/// - `StoreUnavailable`: the database is locked or unreachable
pub fn write_table(
    store: &mut Store,
    reference: &Reference,
    tablename: &str,
    table: &Table,
    options: &WriteOptions,
) -> Result<WriteOutcome> {
    let Reference::Branch { name: branch, head } = reference else {
        return Err(VtError::new(VtErrorKind::ImmutableReference)
            .with_op("write_table")
            .with_table(tablename)
            .with_reference(reference.to_string())
            .with_message("Pinned commits are read-only"));
    };

    let annotate = |e: VertabError| VtError::from(e).with_op("write_table").with_table(tablename);
    validate_identifier(tablename).map_err(annotate)?;

    let mut table = table.clone();
    let missing = table.nan_to_null();
    if missing > 0 {
        tracing::debug!(table = tablename, cells = missing, "Stored NaN cells as null");
    }
    let dropped_rows = table.drop_null_key_rows().map_err(annotate)?;
    if dropped_rows > 0 {
        tracing::warn!(
            table = tablename,
            dropped = dropped_rows,
            "Dropped rows with null primary-key values"
        );
    }
    validate_table(tablename, &table).map_err(annotate)?;

    let cas = store.cas().clone();
    let mut outcome = match options.policy {
        BranchingPolicy::AppendToBranch => {
            append(store.conn_mut(), &cas, branch, tablename, &table, options)?
        }
        BranchingPolicy::CheckoutNoMerge | BranchingPolicy::CheckoutAndMerge => {
            checkout(store.conn_mut(), &cas, branch, head, tablename, &table, options)?
        }
    };
    outcome.dropped_rows = dropped_rows;

    tracing::debug!(
        table = tablename,
        branch = %outcome.branch,
        commit = %outcome.commit.short(),
        status = ?outcome.status,
        "Wrote table"
    );
    Ok(outcome)
}

fn immediate(conn: &mut Connection) -> Result<rusqlite::Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)
}

fn current_tip(conn: &Connection, branch: &str, expected: Option<&CommitId>) -> Result<CommitId> {
    let tip = refs::get_ref(conn, branch)?.ok_or_else(|| reference_not_found(branch))?;
    if let Some(expected) = expected {
        if *expected != tip {
            return Err(VtError::new(VtErrorKind::StaleWrite)
                .with_op("write_table")
                .with_reference(branch)
                .with_commit(tip.as_str())
                .with_message(format!(
                    "Branch moved since {}; now at {}",
                    expected.short(),
                    tip.short()
                )));
        }
    }
    Ok(tip)
}

fn append(
    conn: &mut Connection,
    cas: &FsStore,
    branch: &str,
    tablename: &str,
    table: &Table,
    options: &WriteOptions,
) -> Result<WriteOutcome> {
    let tx = immediate(conn)?;
    let tip = current_tip(&tx, branch, options.expected_head.as_ref())?;
    let parent = commits::require_commit(&tx, &tip)?;

    let Some(record) = commit_onto(&tx, cas, &parent, tablename, table, options)? else {
        return Ok(WriteOutcome {
            commit: tip,
            branch: branch.to_string(),
            checkout_branch: None,
            status: WriteStatus::Unchanged,
            dropped_rows: 0,
        });
    };

    refs::advance_ref(&tx, branch, &tip, &record.commit_id, options.now_ms)?;
    tx.commit().map_err(from_rusqlite)?;

    Ok(WriteOutcome {
        commit: record.commit_id,
        branch: branch.to_string(),
        checkout_branch: None,
        status: WriteStatus::Committed,
        dropped_rows: 0,
    })
}

/// Fork at the head the reference was resolved to, commit there, and for
/// `CheckoutAndMerge` merge the fork back into the branch's current tip.
fn checkout(
    conn: &mut Connection,
    cas: &FsStore,
    branch: &str,
    head: &CommitId,
    tablename: &str,
    table: &Table,
    options: &WriteOptions,
) -> Result<WriteOutcome> {
    let fork = match &options.checkout_branch {
        Some(prefix) => format!("{}-{}", prefix, uuid::Uuid::now_v7().simple()),
        None => format!("{}-checkout-{}", branch, uuid::Uuid::now_v7().simple()),
    };
    validate_branch_name(&fork).map_err(|e| VtError::from(e).with_op("checkout"))?;

    let tx = immediate(conn)?;
    let tip = current_tip(&tx, branch, options.expected_head.as_ref())?;
    let base = commits::require_commit(&tx, head)?;

    let Some(record) = commit_onto(&tx, cas, &base, tablename, table, options)? else {
        let unchanged_at = match options.policy {
            BranchingPolicy::CheckoutAndMerge => tip,
            _ => head.clone(),
        };
        return Ok(WriteOutcome {
            commit: unchanged_at,
            branch: branch.to_string(),
            checkout_branch: None,
            status: WriteStatus::Unchanged,
            dropped_rows: 0,
        });
    };
    refs::create_ref(&tx, &fork, &record.commit_id, options.now_ms)?;
    tx.commit().map_err(from_rusqlite)?;

    if options.policy == BranchingPolicy::CheckoutNoMerge {
        return Ok(WriteOutcome {
            commit: record.commit_id,
            branch: fork.clone(),
            checkout_branch: Some(fork),
            status: WriteStatus::Committed,
            dropped_rows: 0,
        });
    }

    merge_into(conn, cas, branch, &fork, &record.commit_id, options)
}

/// Merge `fork_tip` into `branch`. On conflict the transaction is dropped,
/// leaving `branch` where it was.
fn merge_into(
    conn: &mut Connection,
    cas: &FsStore,
    branch: &str,
    fork: &str,
    fork_tip: &CommitId,
    options: &WriteOptions,
) -> Result<WriteOutcome> {
    let tx = immediate(conn)?;
    let tip = current_tip(&tx, branch, None)?;

    if commits::is_ancestor(&tx, &tip, fork_tip)? {
        refs::advance_ref(&tx, branch, &tip, fork_tip, options.now_ms)?;
        tx.commit().map_err(from_rusqlite)?;
        return Ok(WriteOutcome {
            commit: fork_tip.clone(),
            branch: branch.to_string(),
            checkout_branch: Some(fork.to_string()),
            status: WriteStatus::FastForwarded,
            dropped_rows: 0,
        });
    }

    let ours = commits::require_commit(&tx, &tip)?;
    let theirs = commits::require_commit(&tx, fork_tip)?;
    let base = match commits::merge_base(&tx, &tip, fork_tip)? {
        Some(id) => Some(commits::require_commit(&tx, &id)?),
        None => None,
    };

    let tables = merge_tables(cas, base.as_ref(), &ours, &theirs).map_err(|e| {
        e.with_op("merge")
            .with_reference(branch)
            .with_commit(fork_tip.as_str())
    })?;

    let parents = vec![tip.clone(), fork_tip.clone()];
    let message = format!("Merge branch '{}' into {}", fork, branch);
    let commit_id = compute_commit_id(&parents, &tables, &message, options.now_ms)?;
    let record = CommitRecord {
        commit_id,
        parents,
        tables,
        message,
        created_at: options.now_ms,
        session_id: options.session_id.as_ref().map(|s| s.as_str().to_string()),
    };
    commits::insert_commit(&tx, &record)?;
    refs::advance_ref(&tx, branch, &tip, &record.commit_id, options.now_ms)?;
    tx.commit().map_err(from_rusqlite)?;

    Ok(WriteOutcome {
        commit: record.commit_id,
        branch: branch.to_string(),
        checkout_branch: Some(fork.to_string()),
        status: WriteStatus::Merged,
        dropped_rows: 0,
    })
}

/// Resolve every table present on any side. Tables whose digests settle the
/// question are never loaded.
fn merge_tables(
    cas: &FsStore,
    base: Option<&CommitRecord>,
    ours: &CommitRecord,
    theirs: &CommitRecord,
) -> Result<BTreeMap<String, String>> {
    let names: BTreeSet<&String> = ours
        .tables
        .keys()
        .chain(theirs.tables.keys())
        .chain(base.into_iter().flat_map(|b| b.tables.keys()))
        .collect();

    let mut merged = BTreeMap::new();
    let mut conflicts = Vec::new();

    for name in names {
        let b = base.and_then(|r| r.table_digest(name));
        let o = ours.table_digest(name);
        let t = theirs.table_digest(name);

        let digest = if o == t || b == t {
            o.map(str::to_string)
        } else if b == o {
            t.map(str::to_string)
        } else {
            let load = |d: Option<&str>| d.map(|d| load_snapshot(cas, d)).transpose();
            let (bt, ot, tt) = (load(b)?, load(o)?, load(t)?);
            match merge_table(name, bt.as_ref(), ot.as_ref(), tt.as_ref())? {
                TableMerge::Resolved(Some(table)) => Some(persist_table(cas, name, &table)?),
                TableMerge::Resolved(None) => None,
                TableMerge::Conflicts(found) => {
                    conflicts.extend(found);
                    continue;
                }
            }
        };
        if let Some(digest) = digest {
            merged.insert(name.clone(), digest);
        }
    }

    if !conflicts.is_empty() {
        return Err(VertabError::MergeConflicts { conflicts }.into());
    }
    Ok(merged)
}

/// Commit `table` on top of `parent`. Returns `None` when the resulting
/// snapshot equals the parent's.
fn commit_onto(
    conn: &Connection,
    cas: &FsStore,
    parent: &CommitRecord,
    tablename: &str,
    table: &Table,
    options: &WriteOptions,
) -> Result<Option<CommitRecord>> {
    let composed = match (options.mode, parent.table_digest(tablename)) {
        (SaveMode::Update, Some(digest)) => {
            let stored = load_snapshot(cas, digest)?;
            upsert(tablename, stored, table)?
        }
        _ => table.clone(),
    };

    let digest = persist_table(cas, tablename, &composed)?;
    if parent.table_digest(tablename) == Some(digest.as_str()) {
        return Ok(None);
    }

    let mut tables = parent.tables.clone();
    tables.insert(tablename.to_string(), digest);

    let parents = vec![parent.commit_id.clone()];
    let message = options
        .message
        .clone()
        .unwrap_or_else(|| format!("Save table {}", tablename));
    let commit_id = compute_commit_id(&parents, &tables, &message, options.now_ms)?;

    let record = CommitRecord {
        commit_id,
        parents,
        tables,
        message,
        created_at: options.now_ms,
        session_id: options.session_id.as_ref().map(|s| s.as_str().to_string()),
    };
    commits::insert_commit(conn, &record)?;
    Ok(Some(record))
}

/// Overlay `incoming` rows on `stored` by primary key
fn upsert(tablename: &str, stored: Table, incoming: &Table) -> Result<Table> {
    if stored.schema() != incoming.schema() {
        return Err(VtError::from(VertabError::SchemaMismatch {
            tablename: tablename.to_string(),
            reason: "update mode requires the stored schema".to_string(),
        })
        .with_op("write_table"));
    }
    let mut rows = stored.keyed_rows(tablename)?;
    rows.extend(incoming.keyed_rows(tablename)?);
    Ok(Table::from_rows(
        stored.schema().clone(),
        rows.into_values().collect(),
    )?)
}
