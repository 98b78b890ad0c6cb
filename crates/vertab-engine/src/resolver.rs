//! Branch/reference resolver
//!
//! Turns a dataset's static configuration into the concrete reference the
//! next read or write goes through. A configured `commit` wins over `branch`
//! and yields a read-only reference.

use vertab_core::Reference;
use vertab_store::errors::{reference_not_found, Result};
use vertab_store::graph::{commits, refs};
use vertab_store::Store;

use crate::config::DatasetConfig;

/// Resolve against an already open store
///
/// # Errors
///
/// - `ReferenceNotFound` if the branch or commit does not exist
/// - `InvalidInput` if a pinned commit id is too short or ambiguous
pub fn resolve_in(store: &Store, config: &DatasetConfig) -> Result<Reference> {
    if let Some(commit) = &config.commit {
        let commit = commits::find_commit(store.conn(), commit)?;
        tracing::debug!(commit = %commit.short(), "Resolved pinned commit");
        return Ok(Reference::Pinned { commit });
    }

    let head = refs::get_ref(store.conn(), &config.branch)?
        .ok_or_else(|| reference_not_found(&config.branch))?;
    tracing::debug!(branch = %config.branch, head = %head.short(), "Resolved branch");
    Ok(Reference::Branch {
        name: config.branch.clone(),
        head,
    })
}

/// Open the dataset's store and resolve its reference
///
/// # Errors
///
/// As [`resolve_in`], plus the configuration and store-opening errors.
pub fn resolve(config: &DatasetConfig) -> Result<Reference> {
    config.validate()?;
    let store = config.location()?.open()?;
    resolve_in(&store, config)
}
