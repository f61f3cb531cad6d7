//! The mutable, thread-safe domain error
//!
//! A [`DomainError`] is shared as `Arc<DomainError>` and mutated through
//! `&self`: every setter takes the instance's write lock, every accessor its
//! read lock and returns a copy.
//!
//! The cause is kept outside the lock in an append-only [`CauseLog`] so
//! `std::error::Error::source()` can return a plain reference.

use chrono::{DateTime, Utc};
use faultline_core_types::schema::{EVENT_CYCLE_DETECTED, OP_ROOT_CAUSE};
use faultline_logging::log_op_event;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::cause::{chain_iter, Cause, CauseLog, InheritedContext, MetadataCarrier};
use crate::pool::FramePool;
use crate::stack::{capture_frame, format_frames, CallSite, StackFrame, CHAINED_FRAME_PREFIX};
use crate::taxonomy::{ErrorType, Severity};

/// Lock-protected fields of a [`DomainError`]
#[derive(Debug, Clone)]
pub(crate) struct ErrorState {
    pub code: String,
    pub message: String,
    pub error_type: Option<ErrorType>,
    pub severity: Severity,
    pub category: String,
    pub wrapped: Vec<Cause>,
    pub details: HashMap<String, Value>,
    pub metadata: HashMap<String, Value>,
    pub tags: HashSet<String>,
    pub headers: HashMap<String, String>,
    pub status_code: u16,
    pub stack: Vec<StackFrame>,
    pub timestamp: DateTime<Utc>,
    pub retryable: bool,
    pub temporary: bool,
}

impl ErrorState {
    fn new() -> Self {
        Self {
            code: String::new(),
            message: String::new(),
            error_type: None,
            severity: Severity::default(),
            category: String::new(),
            wrapped: Vec::new(),
            details: HashMap::new(),
            metadata: HashMap::new(),
            tags: HashSet::new(),
            headers: HashMap::new(),
            status_code: 0,
            stack: Vec::new(),
            timestamp: Utc::now(),
            retryable: false,
            temporary: false,
        }
    }

    /// Restore every field to its default, keeping allocated capacity.
    /// Frames go back to `frames` when given.
    fn reset(&mut self, frames: Option<&FramePool>) {
        // Exhaustive on purpose: a new field must be handled here to compile.
        let ErrorState {
            code,
            message,
            error_type,
            severity,
            category,
            wrapped,
            details,
            metadata,
            tags,
            headers,
            status_code,
            stack,
            timestamp,
            retryable,
            temporary,
        } = self;
        code.clear();
        message.clear();
        *error_type = None;
        *severity = Severity::default();
        category.clear();
        wrapped.clear();
        details.clear();
        metadata.clear();
        tags.clear();
        headers.clear();
        *status_code = 0;
        match frames {
            Some(pool) => stack.drain(..).for_each(|frame| pool.release(frame)),
            None => stack.clear(),
        }
        *timestamp = Utc::now();
        *retryable = false;
        *temporary = false;
    }

    /// Apply the defaults row of `t`. Severity and category are only taken
    /// while still at their placeholders; retryable and temporary always are.
    pub fn apply_type(&mut self, t: ErrorType) {
        let defaults = t.defaults();
        self.error_type = Some(t);
        if self.severity == Severity::Medium {
            self.severity = defaults.severity;
        }
        if self.category.is_empty() {
            self.category.push_str(defaults.category);
        }
        self.retryable = defaults.retryable;
        self.temporary = defaults.temporary;
    }

    /// Merge inherited context; keys already present locally win.
    fn inherit(&mut self, ctx: InheritedContext) {
        for (k, v) in ctx.details {
            self.details.entry(k).or_insert(v);
        }
        for (k, v) in ctx.metadata {
            self.metadata.entry(k).or_insert(v);
        }
        self.tags.extend(ctx.tags);
        for (k, v) in ctx.headers {
            self.headers.entry(k).or_insert(v);
        }
    }

    pub fn kind(&self) -> ErrorType {
        self.error_type.unwrap_or(ErrorType::Internal)
    }

    pub fn effective_status(&self) -> u16 {
        if self.status_code != 0 {
            self.status_code
        } else {
            self.kind().http_status()
        }
    }

    pub fn effective_retryable(&self) -> bool {
        self.retryable || self.error_type.is_some_and(|t| t.is_retryable())
    }

    pub fn effective_temporary(&self) -> bool {
        self.temporary || self.error_type.is_some_and(|t| t.is_temporary())
    }

    pub fn sorted_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tags.iter().cloned().collect();
        tags.sort();
        tags
    }
}

/// Mutable domain error value
pub struct DomainError {
    state: RwLock<ErrorState>,
    causes: CauseLog,
    frames: Option<Arc<FramePool>>,
}

impl DomainError {
    /// Unpooled error with a code and message and no type set
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let err = Self::blank(None);
        {
            let mut state = err.state.write();
            state.code = code.into();
            state.message = message.into();
        }
        err
    }

    pub(crate) fn blank(frames: Option<Arc<FramePool>>) -> Self {
        Self {
            state: RwLock::new(ErrorState::new()),
            causes: CauseLog::default(),
            frames,
        }
    }

    /// Reset with exclusive access and adopt `frames` as the frame source
    pub(crate) fn recycle(&mut self, frames: &Arc<FramePool>) {
        self.state.get_mut().reset(self.frames.as_deref());
        self.causes.clear();
        self.frames = Some(frames.clone());
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, ErrorState> {
        self.state.read()
    }

    pub(crate) fn state_mut(&self) -> RwLockWriteGuard<'_, ErrorState> {
        self.state.write()
    }

    /// Drop the whole cause history; only possible with exclusive access
    pub(crate) fn clear_causes(&mut self) {
        self.causes.clear();
    }

    pub(crate) fn identity(&self) -> usize {
        self as *const Self as usize
    }

    // ----- accessors -----

    pub fn code(&self) -> String {
        self.state.read().code.clone()
    }

    pub fn message(&self) -> String {
        self.state.read().message.clone()
    }

    /// The explicitly set type, if any
    pub fn error_type(&self) -> Option<ErrorType> {
        self.state.read().error_type
    }

    /// The effective type: the set type, or `Internal` when unset
    pub fn kind(&self) -> ErrorType {
        self.state.read().kind()
    }

    pub fn severity(&self) -> Severity {
        self.state.read().severity
    }

    pub fn category(&self) -> String {
        self.state.read().category.clone()
    }

    /// The current cause (the `source()` target)
    pub fn cause(&self) -> Option<Cause> {
        self.causes.current().cloned()
    }

    pub fn wrapped(&self) -> Vec<Cause> {
        self.state.read().wrapped.clone()
    }

    pub fn details(&self) -> HashMap<String, Value> {
        self.state.read().details.clone()
    }

    pub fn detail(&self, key: &str) -> Option<Value> {
        self.state.read().details.get(key).cloned()
    }

    pub fn metadata(&self) -> HashMap<String, Value> {
        self.state.read().metadata.clone()
    }

    /// Tags in sorted order
    pub fn tags(&self) -> Vec<String> {
        self.state.read().sorted_tags()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.state.read().tags.contains(tag)
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.state.read().headers.clone()
    }

    pub fn stack(&self) -> Vec<StackFrame> {
        self.state.read().stack.clone()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.state.read().timestamp
    }

    /// Explicit status, or the type's default status when unset
    pub fn status_code(&self) -> u16 {
        self.state.read().effective_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.state.read().effective_retryable()
    }

    pub fn is_temporary(&self) -> bool {
        self.state.read().effective_temporary()
    }

    // ----- setters -----

    pub fn set_code(&self, code: impl Into<String>) -> &Self {
        self.state.write().code = code.into();
        self
    }

    pub fn set_message(&self, message: impl Into<String>) -> &Self {
        self.state.write().message = message.into();
        self
    }

    /// Set the type without touching any other field
    pub fn set_type(&self, t: ErrorType) -> &Self {
        self.state.write().error_type = Some(t);
        self
    }

    pub fn set_severity(&self, severity: Severity) -> &Self {
        self.state.write().severity = severity;
        self
    }

    pub fn set_category(&self, category: impl Into<String>) -> &Self {
        self.state.write().category = category.into();
        self
    }

    pub fn set_status_code(&self, status: u16) -> &Self {
        self.state.write().status_code = status;
        self
    }

    pub fn set_retryable(&self, retryable: bool) -> &Self {
        self.state.write().retryable = retryable;
        self
    }

    pub fn set_temporary(&self, temporary: bool) -> &Self {
        self.state.write().temporary = temporary;
        self
    }

    pub fn set_timestamp(&self, timestamp: DateTime<Utc>) -> &Self {
        self.state.write().timestamp = timestamp;
        self
    }

    pub fn add_detail(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.state.write().details.insert(key.into(), value.into());
        self
    }

    pub fn add_metadata(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.state.write().metadata.insert(key.into(), value.into());
        self
    }

    /// No-op when the tag is already present
    pub fn add_tag(&self, tag: impl Into<String>) -> &Self {
        self.state.write().tags.insert(tag.into());
        self
    }

    pub fn add_header(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.state.write().headers.insert(key.into(), value.into());
        self
    }

    // ----- chaining -----

    /// Make `err` the cause, keeping any previous cause in `wrapped`.
    ///
    /// `None` is a no-op. Records a frame tagged with `message` and inherits
    /// the cause's context when it exposes [`MetadataCarrier`].
    #[track_caller]
    pub fn wrap<C: Into<Cause>>(&self, message: &str, err: Option<C>) -> &Self {
        self.wrap_at(CallSite::caller(), message, err)
    }

    pub fn wrap_at<C: Into<Cause>>(&self, site: CallSite, message: &str, err: Option<C>) -> &Self {
        if let Some(err) = err {
            self.attach_cause(&site, message, err.into(), true);
        }
        self
    }

    /// Append `err` to the side chain without touching the cause.
    /// `None` is a no-op.
    #[track_caller]
    pub fn chain<C: Into<Cause>>(&self, err: Option<C>) -> &Self {
        self.chain_at(CallSite::caller(), err)
    }

    pub fn chain_at<C: Into<Cause>>(&self, site: CallSite, err: Option<C>) -> &Self {
        let Some(err) = err else {
            return self;
        };
        let cause = err.into();
        // Rendered before locking: the chained error may be this one.
        let frame_message = format!("{CHAINED_FRAME_PREFIX}{cause}");
        let mut state = self.state.write();
        capture_frame(&mut state.stack, self.frames.as_deref(), &site, &frame_message);
        state.wrapped.push(cause);
        self
    }

    pub(crate) fn attach_cause(&self, site: &CallSite, frame_message: &str, cause: Cause, keep_previous: bool) {
        // Snapshot before taking our own lock so two errors attaching each
        // other concurrently cannot deadlock.
        let inherited = cause.carrier().map(|carrier| carrier.snapshot());
        let mut state = self.state.write();
        capture_frame(&mut state.stack, self.frames.as_deref(), site, frame_message);
        if keep_previous {
            if let Some(previous) = self.causes.current() {
                state.wrapped.push(previous.clone());
            }
        }
        self.causes.push(cause);
        if let Some(ctx) = inherited {
            state.inherit(ctx);
        }
    }

    /// Innermost error reachable through the cause chain, or `self`.
    ///
    /// Stops at the last error before any repeat, so cyclic chains end.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut walk = chain_iter(self);
        let mut root: &(dyn StdError + 'static) = self;
        for err in walk.by_ref() {
            root = err;
        }
        if walk.hit_cycle() {
            log_op_event!(OP_ROOT_CAUSE, EVENT_CYCLE_DETECTED, err.code = %self.code());
        }
        root
    }

    pub fn format_stack_trace(&self) -> String {
        format_frames(&self.state.read().stack)
    }
}

impl Clone for DomainError {
    fn clone(&self) -> Self {
        let state = self.state.read().clone();
        let causes = CauseLog::default();
        if let Some(cause) = self.causes.current() {
            causes.push(cause.clone());
        }
        Self {
            state: RwLock::new(state),
            causes,
            frames: self.frames.clone(),
        }
    }
}

thread_local! {
    static RENDERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks an error as being rendered on this thread; `None` on re-entry
struct RenderGuard(usize);

impl RenderGuard {
    fn enter(id: usize) -> Option<Self> {
        RENDERING.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&id) {
                None
            } else {
                active.push(id);
                Some(RenderGuard(id))
            }
        })
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        RENDERING.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.0) {
                active.remove(pos);
            }
        });
    }
}

fn write_head(f: &mut fmt::Formatter<'_>, code: &str, message: &str) -> fmt::Result {
    if code.is_empty() {
        f.write_str(message)
    } else {
        write!(f, "[{}] {}", code, message)
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (code, message, wrapped) = {
            let state = self.state.read();
            (state.code.clone(), state.message.clone(), state.wrapped.clone())
        };
        write_head(f, &code, &message)?;
        // A cycle renders each error's head once, then stops.
        let Some(_guard) = RenderGuard::enter(self.identity()) else {
            return Ok(());
        };
        if let Some(cause) = self.causes.current() {
            write!(f, ": {}", cause)?;
        }
        for err in &wrapped {
            write!(f, "; {}", err)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().clone();
        let cause = self.causes.current().map(|c| c.to_string());
        f.debug_struct("DomainError")
            .field("code", &state.code)
            .field("message", &state.message)
            .field("error_type", &state.error_type)
            .field("severity", &state.severity)
            .field("category", &state.category)
            .field("status_code", &state.status_code)
            .field("cause", &cause)
            .field("wrapped", &state.wrapped.len())
            .field("stack", &state.stack.len())
            .finish()
    }
}

impl StdError for DomainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.causes
            .current()
            .map(|cause| cause.error() as &(dyn StdError + 'static))
    }
}

impl MetadataCarrier for DomainError {
    fn details(&self) -> HashMap<String, Value> {
        DomainError::details(self)
    }

    fn metadata(&self) -> HashMap<String, Value> {
        DomainError::metadata(self)
    }

    fn tags(&self) -> Vec<String> {
        DomainError::tags(self)
    }

    fn headers(&self) -> HashMap<String, String> {
        DomainError::headers(self)
    }

    fn snapshot(&self) -> InheritedContext {
        let state = self.state.read();
        InheritedContext {
            details: state.details.clone(),
            metadata: state.metadata.clone(),
            tags: state.sorted_tags(),
            headers: state.headers.clone(),
        }
    }
}

impl From<Arc<DomainError>> for Cause {
    fn from(err: Arc<DomainError>) -> Self {
        Cause::with_carrier(err)
    }
}

impl From<DomainError> for Cause {
    fn from(err: DomainError) -> Self {
        Cause::with_carrier(Arc::new(err))
    }
}
