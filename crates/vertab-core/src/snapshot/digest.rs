//! Digest computation for snapshots and commits.
//!
//! ## Digest Types
//!
//! - **Snapshot Digest**: Hash of a table snapshot's canonical bytes; equal to
//!   the CAS key the snapshot is stored under
//! - **Commit Id**: Hash of a commit's parents, table digests, message and
//!   creation time
//!
//! ## Determinism Guarantees
//!
//! - Same rows (in any order) → same snapshot digest
//! - Table map is a `BTreeMap`, so commit ids do not depend on insertion order

use crate::errors::Result;
use crate::model::CommitId;
use crate::snapshot::table_snapshot::TableSnapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hashed content of a commit
#[derive(Serialize)]
struct CommitContent<'a> {
    parents: &'a [CommitId],
    tables: &'a BTreeMap<String, String>,
    message: &'a str,
    created_at: i64,
}

/// Compute the digest of a table snapshot.
///
/// ## Returns
///
/// Hex-encoded SHA256 digest (64 characters)
///
/// ## Errors
///
/// Returns `VertabError::Serialization` if JSON serialization fails.
pub fn compute_snapshot_digest(snapshot: &TableSnapshot) -> Result<String> {
    Ok(hash_bytes(&snapshot.to_bytes()?))
}

/// Compute the content-addressed id of a commit.
///
/// ## Errors
///
/// Returns `VertabError::Serialization` if JSON serialization fails.
pub fn compute_commit_id(
    parents: &[CommitId],
    tables: &BTreeMap<String, String>,
    message: &str,
    created_at: i64,
) -> Result<CommitId> {
    let canonical = serde_json::to_vec(&CommitContent {
        parents,
        tables,
        message,
        created_at,
    })?;
    Ok(CommitId::new(hash_bytes(&canonical)))
}

/// Hash bytes using SHA256.
pub fn hash_bytes(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}
