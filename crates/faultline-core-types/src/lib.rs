//! Core types shared across Faultline facilities
//!
//! This crate provides foundational types used by both the error core
//! and the logging facility:
//!
//! - **Correlation types**: RequestId, TraceId, RequestContext
//! - **Schema constants**: Canonical log field keys, event names, operation
//!   names and well-known metadata keys

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, TraceId};
