//! Structured logging facility for vertab
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use vertab_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Connector operations log one `start` event and exactly one `end` or
//! `end_error` event. Store internals log at debug level only.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
