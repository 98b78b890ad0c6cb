//! Blob paths are sharded by the first 2 hex characters of the digest.

use std::path::{Path, PathBuf};

/// For digest "abc123...", returns "<root>/ab/abc123.<ext>"
pub fn shard_path(root: &Path, digest: &str, extension: &str) -> PathBuf {
    let shard = &digest[..2.min(digest.len())];
    root.join(shard).join(format!("{}.{}", digest, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_path() {
        let path = shard_path(Path::new("/cas"), "abc123def456", "json");
        assert_eq!(path, PathBuf::from("/cas/ab/abc123def456.json"));
    }

    #[test]
    fn test_short_digest() {
        let path = shard_path(Path::new("/cas"), "a", "json");
        assert_eq!(path, PathBuf::from("/cas/a/a.json"));
    }
}
