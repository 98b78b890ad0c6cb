use crate::model::RowKey;
use thiserror::Error;

/// Result type alias using VertabError
pub type Result<T> = std::result::Result<T, VertabError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by the store or the connector is classified by one
/// of these kinds. Each kind maps to a stable code for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VtErrorKind {
    // Connector contract
    TableNotFound,
    ReferenceNotFound,
    ValidationError,
    MergeConflict,
    ImmutableReference,
    /// Reserved for optimistic-concurrency saves (`expected_head`)
    StaleWrite,
    /// Connectivity or locking failure; the only retryable kind
    StoreUnavailable,
    /// Journal append failed after a successful load/save (warning only)
    JournalAppendFailed,

    // Supporting kinds
    InvalidInput,
    AlreadyExists,
    /// A snapshot digest referenced by a commit is missing from the CAS
    MissingBlob,
    /// A valid surface that this build does not implement (remote stores)
    NotImplemented,
    Serialization,
    Persistence,
    Io,
    Internal,
}

impl VtErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            VtErrorKind::TableNotFound => "ERR_TABLE_NOT_FOUND",
            VtErrorKind::ReferenceNotFound => "ERR_REFERENCE_NOT_FOUND",
            VtErrorKind::ValidationError => "ERR_VALIDATION",
            VtErrorKind::MergeConflict => "ERR_MERGE_CONFLICT",
            VtErrorKind::ImmutableReference => "ERR_IMMUTABLE_REFERENCE",
            VtErrorKind::StaleWrite => "ERR_STALE_WRITE",
            VtErrorKind::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            VtErrorKind::JournalAppendFailed => "ERR_JOURNAL_APPEND_FAILED",
            VtErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            VtErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            VtErrorKind::MissingBlob => "ERR_MISSING_BLOB",
            VtErrorKind::NotImplemented => "ERR_NOT_IMPLEMENTED",
            VtErrorKind::Serialization => "ERR_SERIALIZATION",
            VtErrorKind::Persistence => "ERR_PERSISTENCE",
            VtErrorKind::Io => "ERR_IO",
            VtErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a caller may retry the failed call unchanged.
    ///
    /// Only `StoreUnavailable` qualifies. Saves additionally need the
    /// re-resolve check described on the writer before resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VtErrorKind::StoreUnavailable)
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the context needed to debug a failed
/// load or save: operation, table, reference and commit.
#[derive(Debug, Clone)]
pub struct VtError {
    kind: VtErrorKind,
    op: Option<String>,
    table: Option<String>,
    reference: Option<String>,
    commit: Option<String>,
    message: String,
    source: Option<Box<VtError>>,
}

impl VtError {
    /// Create a new error with the specified kind
    pub fn new(kind: VtErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            reference: None,
            commit: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add table name context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add reference (branch or pinned commit) context
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Add commit id context
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: VtError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> VtErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Shorthand for `kind().is_retryable()`
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&VtError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for VtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(reference) = &self.reference {
            write!(f, " (reference: {})", reference)?;
        }
        if let Some(commit) = &self.commit {
            write!(f, " (commit: {})", commit)?;
        }
        Ok(())
    }
}

impl std::error::Error for VtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// A single unresolvable difference found while merging two branches
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConflict {
    pub tablename: String,
    /// Conflicting primary key; `None` for table-level conflicts
    pub key: Option<RowKey>,
    pub reason: String,
}

impl std::fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} {}: {}", self.tablename, key, self.reason),
            None => write!(f, "{}: {}", self.tablename, self.reason),
        }
    }
}

/// Error taxonomy for the in-memory table kernel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VertabError {
    // ===== Schema Errors =====
    /// Table declares no primary-key columns
    #[error("Primary key must name at least one column")]
    EmptyPrimaryKey,

    /// Primary-key column is not part of the schema
    #[error("Primary key column not in schema: {column}")]
    MissingKeyColumn { column: String },

    /// Column declared twice
    #[error("Duplicate column: {column}")]
    DuplicateColumn { column: String },

    /// Column referenced by name does not exist
    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    /// Table or column name unusable as a store identifier
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Stored and submitted schemas disagree where they must match
    #[error("Schema mismatch for table {tablename}: {reason}")]
    SchemaMismatch { tablename: String, reason: String },

    // ===== Row Errors =====
    /// Row width differs from the schema
    #[error("Row has {found} values but schema declares {expected} columns")]
    RowArity { expected: usize, found: usize },

    /// Column vector length differs from the others
    #[error("Column {column} has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Cell value does not match the declared column type
    #[error("Type mismatch in column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Null in a non-nullable column
    #[error("Null value in non-nullable column {column}")]
    NullValue { column: String },

    /// Row index past the end of the table
    #[error("Row {index} out of range for table with {rows} rows")]
    RowOutOfRange { index: usize, rows: usize },

    /// Two rows share a primary key
    #[error("Duplicate primary key {key} in table {tablename}")]
    DuplicateKey { tablename: String, key: RowKey },

    // ===== Merge Errors =====
    /// Three-way merge found conflicting changes
    #[error("Merge produced {} conflict(s)", conflicts.len())]
    MergeConflicts { conflicts: Vec<MergeConflict> },

    // ===== Generic Errors =====
    /// Snapshot blob written by an unknown format version
    #[error("Unsupported snapshot schema version: {found}")]
    UnsupportedSnapshotVersion { found: u32 },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from VertabError to VtError
impl From<VertabError> for VtError {
    fn from(err: VertabError) -> Self {
        let message = err.to_string();
        match err {
            VertabError::EmptyPrimaryKey
            | VertabError::MissingKeyColumn { .. }
            | VertabError::DuplicateColumn { .. }
            | VertabError::UnknownColumn { .. }
            | VertabError::RowArity { .. }
            | VertabError::ColumnLength { .. }
            | VertabError::TypeMismatch { .. }
            | VertabError::NullValue { .. } => {
                VtError::new(VtErrorKind::ValidationError).with_message(message)
            }
            VertabError::DuplicateKey { tablename, .. }
            | VertabError::SchemaMismatch { tablename, .. } => {
                VtError::new(VtErrorKind::ValidationError)
                    .with_table(tablename)
                    .with_message(message)
            }
            VertabError::InvalidIdentifier { .. } | VertabError::RowOutOfRange { .. } => {
                VtError::new(VtErrorKind::InvalidInput).with_message(message)
            }
            VertabError::MergeConflicts { conflicts } => {
                let detail = conflicts
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                VtError::new(VtErrorKind::MergeConflict)
                    .with_message(format!("{}: {}", message, detail))
            }
            VertabError::UnsupportedSnapshotVersion { .. } | VertabError::Serialization { .. } => {
                VtError::new(VtErrorKind::Serialization).with_message(message)
            }
            VertabError::Internal { .. } => {
                VtError::new(VtErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for VertabError {
    fn from(err: serde_json::Error) -> Self {
        VertabError::Serialization {
            message: err.to_string(),
        }
    }
}
