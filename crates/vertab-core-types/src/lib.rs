//! Core types shared across vertab crates
//!
//! This crate provides foundational types used by the error facility,
//! the logging facility and the connector:
//!
//! - **Correlation types**: SessionId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::SessionId;
