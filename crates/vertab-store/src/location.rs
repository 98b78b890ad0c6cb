//! Store locations and initialisation
//!
//! A store location is a directory holding the SQLite commit graph
//! (`vertab.db`) and the snapshot CAS (`cas/`). Opening a location creates
//! it if needed, applies migrations and seeds the root commit with `main`
//! pointing at it.

use crate::cas::FsStore;
use crate::db;
use crate::errors::{from_rusqlite, io_error, Result};
use crate::graph::{commits, refs};
use crate::migrations::apply_migrations;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use vertab_core::snapshot::compute_commit_id;
use vertab_core::CommitRecord;

pub const DB_FILE: &str = "vertab.db";
pub const CAS_DIR: &str = "cas";
pub const MAIN_BRANCH: &str = "main";
pub const ROOT_MESSAGE: &str = "Initialize data repository";

/// Directory of a versioned-table store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreLocation(PathBuf);

impl StoreLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn db_path(&self) -> PathBuf {
        self.0.join(DB_FILE)
    }

    pub fn cas_root(&self) -> PathBuf {
        self.0.join(CAS_DIR)
    }

    /// Whether a store has been initialised here
    pub fn is_initialized(&self) -> bool {
        self.db_path().is_file()
    }

    /// Open (and if necessary initialise) the store
    pub fn open(&self) -> Result<Store> {
        Store::open(self)
    }
}

impl From<PathBuf> for StoreLocation {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for StoreLocation {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&str> for StoreLocation {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// An open store: one SQLite connection plus the CAS
pub struct Store {
    conn: Connection,
    cas: FsStore,
    location: StoreLocation,
}

impl Store {
    pub fn open(location: &StoreLocation) -> Result<Self> {
        std::fs::create_dir_all(location.path()).map_err(|e| io_error("create_store_dir", e))?;

        let mut conn = db::open(location.db_path())?;
        apply_migrations(&mut conn)?;
        seed_root(&mut conn)?;

        Ok(Self {
            conn,
            cas: FsStore::new(location.cas_root()),
            location: location.clone(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn cas(&self) -> &FsStore {
        &self.cas
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }
}

/// Root commit shared by every store: no parents, no tables, epoch time
pub fn root_commit() -> Result<CommitRecord> {
    let tables = BTreeMap::new();
    let commit_id = compute_commit_id(&[], &tables, ROOT_MESSAGE, 0)?;
    Ok(CommitRecord {
        commit_id,
        parents: Vec::new(),
        tables,
        message: ROOT_MESSAGE.to_string(),
        created_at: 0,
        session_id: None,
    })
}

fn seed_root(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    if refs::get_ref(&tx, MAIN_BRANCH)?.is_none() && refs::list_refs(&tx)?.is_empty() {
        let root = root_commit()?;
        commits::insert_commit(&tx, &root)?;
        refs::create_ref(&tx, MAIN_BRANCH, &root.commit_id, 0)?;
        tracing::debug!(commit = %root.commit_id, "Seeded root commit");
    }

    tx.commit().map_err(from_rusqlite)
}
