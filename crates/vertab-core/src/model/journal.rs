//! Journal entries.

use crate::model::commit::CommitId;
use serde::{Deserialize, Serialize};
use vertab_core_types::SessionId;

/// Kind of connector operation recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Load,
    Save,
}

impl OpKind {
    /// Persisted spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Load => "load",
            OpKind::Save => "save",
        }
    }

    /// Parse the persisted spelling
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "load" => Some(OpKind::Load),
            "save" => Some(OpKind::Save),
            _ => None,
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record. The whole tuple is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JournalEntry {
    pub kind: OpKind,
    pub commit: CommitId,
    pub tablename: String,
    /// Seconds since epoch
    pub timestamp: i64,
    pub session_id: SessionId,
}

/// Conjunctive filter for journal queries; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalFilter {
    pub kind: Option<OpKind>,
    pub commit: Option<CommitId>,
    pub tablename: Option<String>,
    pub session_id: Option<SessionId>,
    /// Inclusive lower bound on `timestamp`
    pub since: Option<i64>,
    /// Inclusive upper bound on `timestamp`
    pub until: Option<i64>,
}

impl JournalFilter {
    pub fn for_table(tablename: impl Into<String>) -> Self {
        Self {
            tablename: Some(tablename.into()),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: OpKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn commit(mut self, commit: CommitId) -> Self {
        self.commit = Some(commit);
        self
    }

    pub fn between(mut self, since: Option<i64>, until: Option<i64>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    /// In-memory evaluation, used by tests and by callers filtering cached entries
    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.kind.map_or(true, |k| k == entry.kind)
            && self.commit.as_ref().map_or(true, |c| *c == entry.commit)
            && self
                .tablename
                .as_deref()
                .map_or(true, |t| t == entry.tablename)
            && self
                .session_id
                .as_ref()
                .map_or(true, |s| *s == entry.session_id)
            && self.since.map_or(true, |s| entry.timestamp >= s)
            && self.until.map_or(true, |u| entry.timestamp <= u)
    }
}
