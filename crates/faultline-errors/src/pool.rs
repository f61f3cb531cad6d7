//! Explicit object pools for errors, validation errors and stack frames
//!
//! Pools are plain values owned by the caller; nothing here is global.
//! Free lists are bounded lock-free queues, so an instance popped by one
//! thread can never be observed by another. A full free list drops the
//! instance instead of growing.
//!
//! Release consumes the caller's `Arc`. If any other handle is still alive
//! (for example because the error became another error's cause) the pool
//! refuses it and the value is freed normally once the last handle drops.

use crossbeam_queue::ArrayQueue;
use faultline_core_types::schema::{EVENT_DISCARDED, EVENT_REJECTED, OP_POOL_INIT, OP_POOL_RELEASE};
use faultline_logging::{log_op_end, log_op_event, log_op_start};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::builder::ErrorBuilder;
use crate::config::PoolConfig;
use crate::domain::DomainError;
use crate::errors::{FaultlineError, Result};
use crate::stack::StackFrame;
use crate::validation::{FieldMap, ValidationError};

/// Free list of stack-frame records
#[derive(Debug)]
pub struct FramePool {
    free: ArrayQueue<StackFrame>,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// A cleared frame, reused when one is idle
    pub fn acquire(&self) -> StackFrame {
        self.free.pop().unwrap_or_default()
    }

    pub fn release(&self, mut frame: StackFrame) {
        frame.clear();
        // Full: the frame is simply dropped.
        let _ = self.free.push(frame);
    }

    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

/// Values a pool can hand out again after a full reset
pub(crate) trait Recycle {
    fn fresh(frames: &Arc<FramePool>) -> Self;
    /// Reset every field with exclusive access and adopt `frames`
    fn recycle(&mut self, frames: &Arc<FramePool>);
}

impl Recycle for DomainError {
    fn fresh(frames: &Arc<FramePool>) -> Self {
        DomainError::blank(Some(frames.clone()))
    }

    fn recycle(&mut self, frames: &Arc<FramePool>) {
        DomainError::recycle(self, frames)
    }
}

impl Recycle for ValidationError {
    fn fresh(frames: &Arc<FramePool>) -> Self {
        ValidationError::blank(Some(frames.clone()))
    }

    fn recycle(&mut self, frames: &Arc<FramePool>) {
        ValidationError::recycle(self, frames)
    }
}

/// Counters snapshot for one free list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances allocated because the free list was empty
    pub created: u64,
    /// Instances handed out again from the free list
    pub reused: u64,
    /// Releases that stored the instance for reuse
    pub recycled: u64,
    /// Releases dropped because the free list was full
    pub discarded: u64,
    /// Releases refused because the instance was still shared
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    reused: AtomicU64,
    recycled: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

struct FreeList<T> {
    queue: ArrayQueue<Arc<T>>,
    counters: Counters,
    kind: &'static str,
}

impl<T: Recycle> FreeList<T> {
    fn new(capacity: usize, kind: &'static str) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            counters: Counters::default(),
            kind,
        }
    }

    fn take(&self, frames: &Arc<FramePool>) -> Arc<T> {
        while let Some(mut item) = self.queue.pop() {
            if let Some(inner) = Arc::get_mut(&mut item) {
                inner.recycle(frames);
                Counters::bump(&self.counters.reused);
                return item;
            }
        }
        Counters::bump(&self.counters.created);
        Arc::new(T::fresh(frames))
    }

    fn give(&self, mut item: Arc<T>, frames: &Arc<FramePool>) -> Result<()> {
        let Some(inner) = Arc::get_mut(&mut item) else {
            let references = Arc::strong_count(&item);
            Counters::bump(&self.counters.rejected);
            tracing::warn!(
                component = module_path!(),
                op = OP_POOL_RELEASE,
                event = EVENT_REJECTED,
                pool.kind = self.kind,
                pool.refs = references,
                "released instance is still shared; not recycled"
            );
            return Err(FaultlineError::SharedInstance { references });
        };
        inner.recycle(frames);
        match self.queue.push(item) {
            Ok(()) => Counters::bump(&self.counters.recycled),
            Err(_dropped) => {
                Counters::bump(&self.counters.discarded);
                log_op_event!(
                    OP_POOL_RELEASE,
                    EVENT_DISCARDED,
                    pool.kind = self.kind,
                    pool.idle = self.queue.len()
                );
            }
        }
        Ok(())
    }

    fn prewarm(&self, count: usize, frames: &Arc<FramePool>) {
        for _ in 0..count {
            Counters::bump(&self.counters.created);
            if self.queue.push(Arc::new(T::fresh(frames))).is_err() {
                break;
            }
        }
    }
}

/// Pool of [`DomainError`] and [`ValidationError`] instances sharing one
/// [`FramePool`]
pub struct ErrorPool {
    config: PoolConfig,
    errors: FreeList<DomainError>,
    validations: FreeList<ValidationError>,
    frames: Arc<FramePool>,
}

impl ErrorPool {
    /// # Errors
    ///
    /// Returns `InvalidConfig` when `config` fails validation.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        log_op_start!(OP_POOL_INIT, pool.prewarm = config.prewarm);
        let start = Instant::now();
        let frames = Arc::new(FramePool::new(config.max_idle_frames));
        let errors = FreeList::new(config.max_idle_errors, "error");
        errors.prewarm(config.prewarm, &frames);
        log_op_end!(
            OP_POOL_INIT,
            duration_ms = start.elapsed().as_millis() as u64,
            pool.idle = errors.queue.len()
        );
        Ok(Self {
            validations: FreeList::new(config.max_idle_validations, "validation"),
            errors,
            frames,
            config,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn frames(&self) -> &Arc<FramePool> {
        &self.frames
    }

    /// A pristine error, reused when one is idle
    pub fn acquire(&self) -> Arc<DomainError> {
        self.errors.take(&self.frames)
    }

    /// Reset `err` and keep it for reuse.
    ///
    /// # Errors
    ///
    /// Returns `SharedInstance` when other handles to `err` are alive; the
    /// instance is not recycled and is freed with its last handle.
    pub fn release(&self, err: Arc<DomainError>) -> Result<()> {
        self.errors.give(err, &self.frames)
    }

    pub fn acquire_validation(&self) -> Arc<ValidationError> {
        self.validations.take(&self.frames)
    }

    /// # Errors
    ///
    /// Same contract as [`ErrorPool::release`].
    pub fn release_validation(&self, err: Arc<ValidationError>) -> Result<()> {
        self.validations.give(err, &self.frames)
    }

    /// Pooled equivalent of [`DomainError::new`]
    pub fn new_error(&self, code: impl Into<String>, message: impl Into<String>) -> Arc<DomainError> {
        let err = self.acquire();
        {
            let mut state = err.state_mut();
            state.code = code.into();
            state.message = message.into();
        }
        err
    }

    /// Builder over a pooled instance
    pub fn builder(&self) -> ErrorBuilder {
        ErrorBuilder::from_error(self.acquire())
    }

    /// Pooled equivalent of [`ValidationError::new`]
    pub fn new_validation_error(&self, message: impl Into<String>, fields: FieldMap) -> Arc<ValidationError> {
        let err = self.acquire_validation();
        err.init(message.into(), fields);
        err
    }

    /// Decode a [`DomainError`] into a pooled instance
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when `bytes` is not a valid error document.
    pub fn error_from_json(&self, bytes: &[u8]) -> Result<Arc<DomainError>> {
        let payload = crate::serializer::decode_error(bytes)?;
        let err = self.acquire();
        payload.apply(&mut err.state_mut());
        Ok(err)
    }

    pub fn stats(&self) -> PoolStats {
        self.errors.counters.snapshot()
    }

    pub fn validation_stats(&self) -> PoolStats {
        self.validations.counters.snapshot()
    }

    pub fn idle(&self) -> usize {
        self.errors.queue.len()
    }

    pub fn idle_validations(&self) -> usize {
        self.validations.queue.len()
    }
}

impl Default for ErrorPool {
    fn default() -> Self {
        let config = PoolConfig::default();
        let frames = Arc::new(FramePool::new(config.max_idle_frames));
        Self {
            errors: FreeList::new(config.max_idle_errors, "error"),
            validations: FreeList::new(config.max_idle_validations, "validation"),
            frames,
            config,
        }
    }
}

impl std::fmt::Debug for ErrorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorPool")
            .field("config", &self.config)
            .field("idle", &self.idle())
            .field("idle_validations", &self.idle_validations())
            .field("idle_frames", &self.frames.idle())
            .finish()
    }
}
