//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent across the connector, the
//! store and the logging macros.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";

// Entity identifiers
pub const FIELD_DATASET: &str = "dataset";
pub const FIELD_TABLE: &str = "table";
pub const FIELD_REFERENCE: &str = "reference";
pub const FIELD_COMMIT: &str = "commit";

// Collection sizes
pub const FIELD_ROW_COUNT: &str = "row_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_JOURNAL_WARNING: &str = "journal_warning";
