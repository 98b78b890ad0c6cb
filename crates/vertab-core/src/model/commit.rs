//! Commit records and references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque, content-addressed commit handle
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines and summaries
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of every table in the store.
///
/// `tables` maps table name to the CAS digest of that table's canonical
/// snapshot. A commit never changes once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_id: CommitId,
    /// Zero parents for the root commit, one for a save, two for a merge
    pub parents: Vec<CommitId>,
    pub tables: BTreeMap<String, String>,
    pub message: String,
    /// Milliseconds since epoch
    pub created_at: i64,
    /// Session that produced the commit, if any
    pub session_id: Option<String>,
}

impl CommitRecord {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    pub fn table_digest(&self, tablename: &str) -> Option<&str> {
        self.tables.get(tablename).map(String::as_str)
    }

    /// Creation time rendered as RFC3339, or the raw millis if out of range
    pub fn created_at_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.created_at)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.created_at.to_string())
    }
}

/// Where a read or write is directed after resolution.
///
/// Branches are writable; pinned commits are read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A named branch, with the tip observed at resolution time
    Branch { name: String, head: CommitId },
    /// A historical commit ("as of"); never a save target
    Pinned { commit: CommitId },
}

impl Reference {
    /// Commit the reference pointed at when it was resolved
    pub fn commit(&self) -> &CommitId {
        match self {
            Reference::Branch { head, .. } => head,
            Reference::Pinned { commit } => commit,
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Reference::Pinned { .. })
    }

    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Reference::Branch { name, .. } => Some(name),
            Reference::Pinned { .. } => None,
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Branch { name, .. } => f.write_str(name),
            Reference::Pinned { commit } => write!(f, "@{}", commit.short()),
        }
    }
}
