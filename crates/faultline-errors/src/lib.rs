//! Faultline error core
//!
//! A mutable, thread-safe domain error value with metadata, cause chaining,
//! cycle-safe root-cause resolution, explicit pooling and a stable JSON shape.
//!
//! # Overview
//!
//! - [`DomainError`]: the error value, shared as `Arc<DomainError>` and
//!   mutated through `&self` under its own lock
//! - [`ErrorBuilder`]: fluent construction with type-derived defaults
//! - [`ValidationError`]: a domain error with ordered per-field messages
//! - [`ErrorPool`]: caller-owned free lists for errors and stack frames
//! - [`cause`]: cause handles, the [`MetadataCarrier`] capability and
//!   cycle-safe traversal over any `dyn Error`
//! - [`JsonRender`]: per-type JSON documents
//!
//! # Example
//!
//! ```
//! use faultline_errors::ErrorPool;
//!
//! let pool = ErrorPool::default();
//! let inner = pool.new_error("A", "first");
//! let outer = pool.new_error("B", "second");
//! outer.wrap("ctx", Some(inner));
//! assert_eq!(outer.to_string(), "[B] second: [A] first");
//! ```
//!
//! Failures of the library itself (bad configuration, encoding, releasing a
//! shared instance) are reported as [`FaultlineError`].

pub mod builder;
pub mod cause;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pool;
pub mod serializer;
pub mod stack;
pub mod taxonomy;
pub mod validation;

pub use builder::ErrorBuilder;
pub use cause::{
    chain_contains, chain_iter, find_in_chain, root_cause_of, Cause, InheritedContext, MetadataCarrier, SharedError,
};
pub use config::PoolConfig;
pub use domain::DomainError;
pub use errors::{FaultlineError, Result};
pub use pool::{ErrorPool, FramePool, PoolStats};
pub use serializer::{ErrorPayload, JsonRender, ValidationPayload};
pub use stack::{CallSite, StackFrame};
pub use taxonomy::{ErrorType, Severity, TypeDefaults};
pub use validation::{FieldMap, ValidationError};
