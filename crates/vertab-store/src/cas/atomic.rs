//! Temp-then-rename writes, so readers never observe a partial blob

use crate::errors::{io_error, Result};
use std::fs;
use std::path::Path;

/// Atomically write bytes to a file, creating parent directories.
///
/// The temp name carries a random suffix so concurrent writers of the same
/// blob never share a temp file.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_cas_dir", e))?;
    }

    let temp_path = target_path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    fs::write(&temp_path, content).map_err(|e| io_error("write_cas_temp", e))?;

    if let Err(e) = fs::rename(&temp_path, target_path) {
        fs::remove_file(&temp_path).ok();
        return Err(io_error("rename_cas_temp", e));
    }
    Ok(())
}
