//! Write policies
//!
//! [`BranchingPolicy`] decides how a save advances or forks references;
//! [`SaveMode`] decides how the saved rows combine with the stored ones.

use serde::{Deserialize, Serialize};

/// How a write advances or forks references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchingPolicy {
    /// Commit onto the tip of the resolved branch and advance it
    #[default]
    AppendToBranch,
    /// Fork a new branch at the tip, commit there, leave the original alone
    CheckoutNoMerge,
    /// Fork, commit, then merge the fork back into the original branch
    CheckoutAndMerge,
}

impl BranchingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchingPolicy::AppendToBranch => "append_to_branch",
            BranchingPolicy::CheckoutNoMerge => "checkout_no_merge",
            BranchingPolicy::CheckoutAndMerge => "checkout_and_merge",
        }
    }

    /// Parse a policy name, accepting snake_case or kebab-case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "append_to_branch" => Some(BranchingPolicy::AppendToBranch),
            "checkout_no_merge" => Some(BranchingPolicy::CheckoutNoMerge),
            "checkout_and_merge" => Some(BranchingPolicy::CheckoutAndMerge),
            _ => None,
        }
    }

    /// Whether the write lands on a freshly forked branch
    pub fn forks(&self) -> bool {
        !matches!(self, BranchingPolicy::AppendToBranch)
    }
}

impl std::fmt::Display for BranchingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How saved rows combine with the table's current rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// The saved table becomes the table's entire row set
    #[default]
    Replace,
    /// Saved rows are upserted by primary key; other stored rows are kept
    Update,
}

impl SaveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveMode::Replace => "replace",
            SaveMode::Update => "update",
        }
    }
}
