//! Filesystem-based CAS holding canonical table snapshots

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::shard_path;
use crate::errors::{cas_collision, cas_missing, io_error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use vertab_core::snapshot::hash_bytes;

const EXTENSION: &str = "json";

/// Filesystem-based CAS store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write content and return its SHA256 digest.
    ///
    /// Idempotent for identical content. Existing content under the same
    /// digest that differs is reported as a collision.
    pub fn write(&self, content: &[u8]) -> Result<String> {
        let digest = hash_bytes(content);
        let target_path = shard_path(&self.root, &digest, EXTENSION);

        if target_path.exists() {
            let existing = fs::read(&target_path).map_err(|e| io_error("read_cas", e))?;
            if existing == content {
                return Ok(digest);
            }
            return Err(cas_collision(&digest));
        }

        atomic_write(&target_path, content)?;
        Ok(digest)
    }

    /// Read content by digest
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let path = shard_path(&self.root, digest, EXTENSION);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(cas_missing(digest)),
            Err(e) => Err(io_error("read_cas", e)),
        }
    }

    pub fn contains(&self, digest: &str) -> bool {
        shard_path(&self.root, digest, EXTENSION).exists()
    }
}
