//! Structured logging facility for Faultline
//!
//! This crate provides:
//! - A single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`,
//!   `log_op_error!`, `log_op_event!`)
//! - Test capture mode for deterministic assertions on emitted events
//!
//! # Usage
//!
//! ```rust
//! use faultline_logging::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! The error core emits its own lifecycle events (pool discards, rejected
//! releases, cause cycles, builder defaulting) through the same macros, so a
//! single subscriber configuration covers the whole workspace.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile, PROFILE_ENV_VAR};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

#[doc(hidden)]
pub use faultline_core_types as __core_types;
#[doc(hidden)]
pub use tracing as __tracing;
