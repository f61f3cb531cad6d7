use faultline_errors::{Cause, DomainError, ErrorPool, PoolConfig};
use std::sync::Arc;

/// Foreign cause that carries no metadata
#[allow(dead_code)]
pub fn io_cause(message: &str) -> Cause {
    Cause::new(std::io::Error::other(message.to_string()))
}

/// Unpooled shared error with a code and message
#[allow(dead_code)]
pub fn shared(code: &str, message: &str) -> Arc<DomainError> {
    Arc::new(DomainError::new(code, message))
}

/// Pool whose free lists hold at most `idle` instances
#[allow(dead_code)]
pub fn pool_with_idle(idle: usize) -> ErrorPool {
    ErrorPool::new(PoolConfig {
        max_idle_errors: idle,
        max_idle_validations: idle,
        ..PoolConfig::default()
    })
    .expect("valid pool config")
}

/// Asserts that `err` carries nothing from a previous use
#[allow(dead_code)]
pub fn assert_pristine(err: &DomainError) {
    assert_eq!(err.code(), "");
    assert_eq!(err.message(), "");
    assert_eq!(err.error_type(), None);
    assert_eq!(err.severity(), faultline_errors::Severity::Medium);
    assert_eq!(err.category(), "");
    assert!(err.cause().is_none());
    assert!(err.wrapped().is_empty());
    assert!(err.details().is_empty());
    assert!(err.metadata().is_empty());
    assert!(err.tags().is_empty());
    assert!(err.headers().is_empty());
    assert!(err.stack().is_empty());
    assert_eq!(err.status_code(), 500);
    assert!(!err.is_retryable());
    assert!(!err.is_temporary());
}
