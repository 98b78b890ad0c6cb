//! Canonical logging macros
//!
//! Field names and event values come from `vertab_core_types::schema`.

/// Log the start of an operation
///
/// ```
/// # use vertab_core::log_op_start;
/// log_op_start!("save");
/// log_op_start!("save", dataset = "scooters");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use vertab_core::log_op_end;
/// log_op_end!("load", duration_ms = 3);
/// log_op_end!("load", duration_ms = 3, commit = "abc");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation failure with its stable error kind and code.
///
/// `$err` is anything convertible into `VtError`; pass a clone or reference
/// conversion if the error is still needed afterwards.
///
/// ```
/// # use vertab_core::{log_op_error, errors::{VtError, VtErrorKind}};
/// let err = VtError::new(VtErrorKind::TableNotFound).with_table("scooters");
/// log_op_error!("load", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let vt_err: $crate::errors::VtError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?vt_err.kind(),
            err_code = vt_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let vt_err: $crate::errors::VtError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?vt_err.kind(),
            err_code = vt_err.code(),
            $($field)*
        );
    }};
}
