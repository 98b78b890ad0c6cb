//! Commit graph
//!
//! Commits live in an arena keyed by content-addressed id; references are a
//! separate name → id mapping. Nothing here holds pointers between commits.

pub mod commits;
pub mod refs;

use crate::errors::{reference_not_found, Result};
use rusqlite::Connection;
use vertab_core::{CommitId, Reference};

/// Current commit of a reference.
///
/// Branches are re-read from `refs`, so a branch that moved since it was
/// resolved yields its new tip. Pinned commits must exist in the arena.
pub fn resolve_tip(conn: &Connection, reference: &Reference) -> Result<CommitId> {
    match reference {
        Reference::Branch { name, .. } => {
            refs::get_ref(conn, name)?.ok_or_else(|| reference_not_found(name))
        }
        Reference::Pinned { commit } => {
            if commits::get_commit(conn, commit)?.is_some() {
                Ok(commit.clone())
            } else {
                Err(reference_not_found(commit.as_str()))
            }
        }
    }
}
