//! Error handling for vertab-store
//!
//! Wraps vertab-core `VtError` with store-specific helpers

use rusqlite::ErrorCode;
use vertab_core::errors::{VtError, VtErrorKind};

/// Result type alias using VtError
pub type Result<T> = std::result::Result<T, VtError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> VtError {
    VtError::new(VtErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> VtError {
    VtError::new(VtErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a CAS collision error
pub fn cas_collision(digest: &str) -> VtError {
    VtError::new(VtErrorKind::AlreadyExists)
        .with_op("cas_write")
        .with_message(format!("CAS collision for digest {}", digest))
}

/// Create a CAS missing blob error
pub fn cas_missing(digest: &str) -> VtError {
    VtError::new(VtErrorKind::MissingBlob)
        .with_op("cas_read")
        .with_message(format!("CAS blob not found for digest {}", digest))
}

/// Classify a rusqlite error.
///
/// Busy, locked, unopenable and I/O failures are `StoreUnavailable`
/// (retryable); everything else is `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> VtError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure => VtErrorKind::StoreUnavailable,
            _ => VtErrorKind::Persistence,
        },
        _ => VtErrorKind::Persistence,
    };
    VtError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Like [`from_rusqlite`], tagged with the failing operation
pub fn sqlite_op(op: &'static str) -> impl Fn(rusqlite::Error) -> VtError {
    move |err| from_rusqlite(err).with_op(op)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> VtError {
    VtError::new(VtErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

pub fn reference_not_found(reference: &str) -> VtError {
    VtError::new(VtErrorKind::ReferenceNotFound)
        .with_reference(reference)
        .with_message(format!("Reference '{}' does not resolve", reference))
}

pub fn table_not_found(tablename: &str, commit: &str) -> VtError {
    VtError::new(VtErrorKind::TableNotFound)
        .with_table(tablename)
        .with_commit(commit)
        .with_message(format!("Table '{}' does not exist at this commit", tablename))
}
