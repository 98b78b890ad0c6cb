//! Name checks for tables, journal tables and branches.
//!
//! Journal tables are created with dynamic DDL, so their names are restricted
//! to plain SQL identifiers. Table names share the same rule so they can be
//! used as journal `tablename` values and in diagnostics unquoted.

use crate::errors::{Result, VertabError};

const MAX_IDENTIFIER_LEN: usize = 64;
const MAX_BRANCH_LEN: usize = 128;

/// Names the store uses for its own bookkeeping tables
const RESERVED: &[&str] = &[
    "commits",
    "commit_parents",
    "commit_tables",
    "refs",
    "schema_version",
];

fn invalid(name: &str, reason: &str) -> VertabError {
    VertabError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Check a table name: `[A-Za-z_][A-Za-z0-9_]*`, at most 64 characters.
///
/// # Errors
///
/// `InvalidIdentifier` describing the first rule broken.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid(name, "must not be empty"));
    };
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(name, "longer than 64 characters"));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid(name, "must start with a letter or underscore"));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(
            name,
            "only letters, digits and underscores are allowed",
        ));
    }
    Ok(())
}

/// Check a journal table name: an identifier that does not shadow store tables.
///
/// # Errors
///
/// `InvalidIdentifier` if the name is malformed or reserved.
pub fn validate_journal_table(name: &str) -> Result<()> {
    validate_identifier(name)?;
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
        || name.to_ascii_lowercase().starts_with("sqlite_")
    {
        return Err(invalid(name, "reserved by the store"));
    }
    Ok(())
}

/// Check a branch name: non-empty, `[A-Za-z0-9._/-]`, no `..`, no leading or
/// trailing `/`.
///
/// # Errors
///
/// `InvalidIdentifier` describing the first rule broken.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "must not be empty"));
    }
    if name.len() > MAX_BRANCH_LEN {
        return Err(invalid(name, "longer than 128 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
    {
        return Err(invalid(
            name,
            "only letters, digits, '.', '_', '/' and '-' are allowed",
        ));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }
    Ok(())
}
