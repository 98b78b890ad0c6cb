//! Table snapshot domain logic.
//!
//! ## Responsibilities
//!
//! - Define the canonical snapshot schema for one table at one commit
//! - Compute deterministic digests (snapshot, commit id)
//!
//! ## Non-Responsibilities
//!
//! - Persistence (handled by `vertab-store`)
//! - Reference handling (handled by `vertab-engine`)

pub mod digest;
pub mod table_snapshot;

pub use digest::{compute_commit_id, compute_snapshot_digest, hash_bytes};
pub use table_snapshot::{TableSnapshot, SNAPSHOT_SCHEMA_VERSION};
