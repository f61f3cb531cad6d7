//! Fluent construction over one [`DomainError`]
//!
//! Every `with_*` call goes through the error's own lock, so a builder is
//! just an owned handle with chaining sugar. `build()` applies the defaulting
//! rules and hands the handle back.

use faultline_core_types::schema::{EVENT_DEFAULTED, META_REQUEST_ID, META_TRACE_ID, OP_BUILD};
use faultline_core_types::{RequestContext, RequestId, TraceId};
use faultline_logging::log_op_event;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::cause::Cause;
use crate::domain::DomainError;
use crate::stack::{CallSite, WRAPPED_FRAME_MESSAGE};
use crate::taxonomy::{ErrorType, Severity};

/// Message filled in by `build()` when a typed error has none
pub const DEFAULT_MESSAGE: &str = "Unknown error";
/// Code filled in by `build()` when a typed error has none
pub const DEFAULT_CODE: &str = "E999";

pub const CODE_VALIDATION: &str = "VALIDATION_ERROR";
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";
pub const CODE_TIMEOUT: &str = "TIMEOUT";
pub const CODE_RATE_LIMIT: &str = "RATE_LIMIT_EXCEEDED";
pub const CODE_CIRCUIT_BREAKER: &str = "CIRCUIT_BREAKER_OPEN";

/// Builder for [`DomainError`]
///
/// # Example
///
/// ```
/// use faultline_errors::{ErrorBuilder, ErrorType};
///
/// let err = ErrorBuilder::new()
///     .with_code("ORDER_LOCKED")
///     .with_message("order is locked")
///     .with_type(ErrorType::Conflict)
///     .with_detail("order_id", 42)
///     .build();
/// assert_eq!(err.to_string(), "[ORDER_LOCKED] order is locked");
/// assert_eq!(err.status_code(), 409);
/// ```
#[derive(Debug)]
pub struct ErrorBuilder {
    error: Arc<DomainError>,
}

impl Default for ErrorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorBuilder {
    /// Builder over a fresh, unpooled error
    pub fn new() -> Self {
        Self::from_error(Arc::new(DomainError::blank(None)))
    }

    pub(crate) fn from_error(error: Arc<DomainError>) -> Self {
        Self { error }
    }

    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.error.set_code(code);
        self
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.error.set_message(message);
        self
    }

    /// Set the type and apply its defaults row.
    ///
    /// Severity is replaced only while it is still `Medium` and category only
    /// while empty, so call `with_severity`/`with_category` first to keep
    /// custom values. Retryable and temporary always follow the type.
    pub fn with_type(self, t: ErrorType) -> Self {
        self.error.state_mut().apply_type(t);
        self
    }

    pub fn with_severity(self, severity: Severity) -> Self {
        self.error.set_severity(severity);
        self
    }

    pub fn with_category(self, category: impl Into<String>) -> Self {
        self.error.set_category(category);
        self
    }

    pub fn with_status_code(self, status: u16) -> Self {
        self.error.set_status_code(status);
        self
    }

    pub fn with_retryable(self, retryable: bool) -> Self {
        self.error.set_retryable(retryable);
        self
    }

    pub fn with_temporary(self, temporary: bool) -> Self {
        self.error.set_temporary(temporary);
        self
    }

    /// Set the cause and record a `"wrapped error"` frame. `None` is a no-op.
    ///
    /// A replaced cause is released at once while the builder holds the only
    /// handle to its error.
    #[track_caller]
    pub fn with_cause<C: Into<Cause>>(self, err: Option<C>) -> Self {
        self.with_cause_at(CallSite::caller(), err)
    }

    pub fn with_cause_at<C: Into<Cause>>(mut self, site: CallSite, err: Option<C>) -> Self {
        if let Some(err) = err {
            if let Some(error) = Arc::get_mut(&mut self.error) {
                error.clear_causes();
            }
            self.error
                .attach_cause(&site, WRAPPED_FRAME_MESSAGE, err.into(), false);
        }
        self
    }

    pub fn with_detail(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.error.add_detail(key, value);
        self
    }

    pub fn with_details<K, V>(self, details: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        {
            let mut state = self.error.state_mut();
            for (k, v) in details {
                state.details.insert(k.into(), v.into());
            }
        }
        self
    }

    pub fn with_metadata(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.error.add_metadata(key, value);
        self
    }

    pub fn with_metadata_map<K, V>(self, metadata: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        {
            let mut state = self.error.state_mut();
            for (k, v) in metadata {
                state.metadata.insert(k.into(), v.into());
            }
        }
        self
    }

    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        self.error.add_tag(tag);
        self
    }

    pub fn with_tags<T: Into<String>>(self, tags: impl IntoIterator<Item = T>) -> Self {
        {
            let mut state = self.error.state_mut();
            state.tags.extend(tags.into_iter().map(Into::into));
        }
        self
    }

    pub fn with_header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.error.add_header(key, value);
        self
    }

    pub fn with_headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        {
            let mut state = self.error.state_mut();
            for (k, v) in headers {
                state.headers.insert(k.into(), v.into());
            }
        }
        self
    }

    pub fn with_request_id(self, request_id: &RequestId) -> Self {
        self.with_metadata(META_REQUEST_ID, request_id.as_str())
    }

    pub fn with_trace_id(self, trace_id: &TraceId) -> Self {
        self.with_metadata(META_TRACE_ID, trace_id.as_str())
    }

    pub fn with_request_context(self, ctx: &RequestContext) -> Self {
        self.with_metadata_map(ctx.metadata_pairs())
    }

    /// Apply defaulting and return the error.
    ///
    /// A typed error missing its message or code gets [`DEFAULT_MESSAGE`] /
    /// [`DEFAULT_CODE`]. An untyped error becomes `Internal`; when it also has
    /// neither code nor message both defaults are filled too.
    pub fn build(self) -> Arc<DomainError> {
        let defaulted = {
            let mut state = self.error.state_mut();
            let defaulted = if state.error_type.is_none() {
                state.error_type = Some(ErrorType::Internal);
                state.code.is_empty() && state.message.is_empty()
            } else {
                state.code.is_empty() || state.message.is_empty()
            };
            if defaulted {
                if state.message.is_empty() {
                    state.message.push_str(DEFAULT_MESSAGE);
                }
                if state.code.is_empty() {
                    state.code.push_str(DEFAULT_CODE);
                }
            }
            defaulted.then(|| state.code.clone())
        };
        if let Some(code) = defaulted {
            log_op_event!(OP_BUILD, EVENT_DEFAULTED, err.code = %code);
        }
        self.error
    }

    fn default_code(self, code: &str) -> Self {
        {
            let mut state = self.error.state_mut();
            if state.code.is_empty() {
                state.code.push_str(code);
            }
        }
        self
    }

    pub fn build_validation_error(self, message: impl Into<String>) -> Arc<DomainError> {
        self.with_message(message)
            .with_type(ErrorType::Validation)
            .default_code(CODE_VALIDATION)
            .build()
    }

    pub fn build_not_found_error(self, resource: &str, id: impl Into<Value>) -> Arc<DomainError> {
        self.with_message(format!("{resource} not found"))
            .with_type(ErrorType::NotFound)
            .with_detail("resource", resource)
            .with_detail("id", id)
            .default_code(CODE_NOT_FOUND)
            .build()
    }

    pub fn build_business_error(self, code: impl Into<String>, message: impl Into<String>) -> Arc<DomainError> {
        self.with_code(code)
            .with_message(message)
            .with_type(ErrorType::BusinessRule)
            .build()
    }

    #[track_caller]
    pub fn build_internal_error<C: Into<Cause>>(self, message: impl Into<String>, cause: Option<C>) -> Arc<DomainError> {
        let site = CallSite::caller();
        self.with_message(message)
            .with_type(ErrorType::Internal)
            .with_cause_at(site, cause)
            .default_code(CODE_INTERNAL)
            .build()
    }

    pub fn build_timeout_error(self, operation: &str, timeout: Duration) -> Arc<DomainError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.with_message(format!("{operation} timed out after {timeout_ms}ms"))
            .with_type(ErrorType::Timeout)
            .with_detail("operation", operation)
            .with_detail("timeout_ms", timeout_ms)
            .default_code(CODE_TIMEOUT)
            .build()
    }

    pub fn build_rate_limit_error(self, limit: u64, window: Duration) -> Arc<DomainError> {
        let window_secs = window.as_secs();
        self.with_message(format!("rate limit of {limit} per {window_secs}s exceeded"))
            .with_type(ErrorType::RateLimit)
            .with_detail("limit", limit)
            .with_detail("window_secs", window_secs)
            .default_code(CODE_RATE_LIMIT)
            .build()
    }

    pub fn build_circuit_breaker_error(self, service: &str) -> Arc<DomainError> {
        self.with_message(format!("circuit breaker open for {service}"))
            .with_type(ErrorType::CircuitBreaker)
            .with_detail("service", service)
            .default_code(CODE_CIRCUIT_BREAKER)
            .build()
    }
}
