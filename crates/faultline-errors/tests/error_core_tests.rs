#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{io_cause, shared};
use faultline_errors::{DomainError, ErrorType, Severity};
use serde_json::Value;

#[test]
fn test_render_code_and_message() {
    let err = DomainError::new("E001", "user not found");
    assert_eq!(err.to_string(), "[E001] user not found");
}

#[test]
fn test_render_wrapped_error() {
    let a = shared("A", "first");
    let b = DomainError::new("B", "second");
    b.wrap("ctx", Some(a));
    assert_eq!(b.to_string(), "[B] second: [A] first");
}

#[test]
fn test_render_side_chain_after_cause() {
    let err = DomainError::new("B", "second");
    err.wrap("ctx", Some(io_cause("disk full")));
    err.chain(Some(io_cause("retry failed")));
    err.chain(Some(shared("C", "third")));
    assert_eq!(
        err.to_string(),
        "[B] second: disk full; retry failed; [C] third"
    );
}

#[test]
fn test_wrap_none_is_noop() {
    let err = DomainError::new("E", "m");
    err.wrap("ctx", None::<faultline_errors::Cause>);
    err.chain(None::<faultline_errors::Cause>);
    assert!(err.cause().is_none());
    assert!(err.stack().is_empty());
    assert!(err.wrapped().is_empty());
}

#[test]
fn test_second_wrap_moves_old_cause_to_wrapped() {
    let first = shared("A", "first");
    let second = shared("C", "third");
    let err = DomainError::new("B", "second");
    err.wrap("one", Some(first.clone()));
    err.wrap("two", Some(second.clone()));
    assert!(err.cause().unwrap().is(&second));
    let wrapped = err.wrapped();
    assert_eq!(wrapped.len(), 1);
    assert!(wrapped[0].is(&first));
    assert_eq!(err.to_string(), "[B] second: [C] third; [A] first");
}

#[test]
fn test_wrap_inherits_missing_context_only() {
    let inner = shared("A", "first");
    inner
        .add_detail("user_id", 42)
        .add_detail("shard", "eu-1")
        .add_metadata("request_id", "r-9")
        .add_tag("db")
        .add_header("x-retry", "1");

    let outer = DomainError::new("B", "second");
    outer.add_detail("user_id", 7);
    outer.wrap("ctx", Some(inner));

    let details = outer.details();
    assert_eq!(details["user_id"], Value::from(7));
    assert_eq!(details["shard"], Value::from("eu-1"));
    assert_eq!(outer.metadata()["request_id"], Value::from("r-9"));
    assert!(outer.has_tag("db"));
    assert_eq!(outer.headers()["x-retry"], "1");
}

#[test]
fn test_foreign_cause_inherits_nothing() {
    let err = DomainError::new("B", "second");
    err.wrap("ctx", Some(io_cause("boom")));
    assert!(err.details().is_empty());
    assert!(err.tags().is_empty());
}

#[test]
fn test_wrap_frame_records_this_file() {
    let err = DomainError::new("B", "second");
    err.wrap("loading profile", Some(io_cause("boom")));
    let stack = err.stack();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack[0].message, "loading profile");
    assert_eq!(stack[0].file, "error_core_tests.rs");
    assert_eq!(stack[0].function, "unknown");
}

#[test]
fn test_chain_frame_message() {
    let err = DomainError::new("B", "second");
    err.chain(Some(io_cause("timeout")));
    assert_eq!(err.stack()[0].message, "Chained error: timeout");
    assert!(err.cause().is_none());
}

#[test]
fn test_wrap_at_uses_explicit_call_site() {
    let err = DomainError::new("B", "second");
    err.wrap_at(faultline_errors::call_site!(), "ctx", Some(io_cause("x")));
    let frame = &err.stack()[0];
    assert_eq!(frame.function, "test_wrap_at_uses_explicit_call_site");
    assert_eq!(frame.file, "error_core_tests.rs");
}

#[test]
fn test_format_stack_trace() {
    let err = DomainError::new("B", "second");
    err.wrap_at(
        faultline_errors::CallSite::new("app::repo::load", "src/repo.rs", 12),
        "query failed",
        Some(io_cause("x")),
    );
    assert_eq!(
        err.format_stack_trace(),
        "1. query failed\n   at load (repo.rs:12)\n"
    );
}

#[test]
fn test_accessors_return_copies() {
    let err = DomainError::new("E", "m");
    err.add_detail("k", 1);
    let mut details = err.details();
    details.insert("other".into(), Value::from(2));
    assert_eq!(err.details().len(), 1);
}

#[test]
fn test_clone_is_independent() {
    let err = DomainError::new("E", "m");
    err.add_tag("a");
    err.wrap("ctx", Some(io_cause("x")));
    let copy = err.clone();
    copy.add_tag("b");
    copy.set_code("F");
    assert_eq!(err.tags(), vec!["a".to_string()]);
    assert_eq!(err.code(), "E");
    assert_eq!(copy.cause().unwrap().to_string(), "x");
    assert_eq!(copy.stack().len(), 1);
}

#[test]
fn test_flags_or_explicit_and_type() {
    let err = DomainError::new("E", "m");
    assert!(!err.is_retryable());
    err.set_retryable(true);
    assert!(err.is_retryable());

    let typed = DomainError::new("E", "m");
    typed.set_type(ErrorType::RateLimit);
    assert!(typed.is_retryable());
    assert!(typed.is_temporary());
}

#[test]
fn test_set_type_leaves_other_fields() {
    let err = DomainError::new("E", "m");
    err.set_type(ErrorType::Authentication);
    assert_eq!(err.severity(), Severity::Medium);
    assert_eq!(err.category(), "");
    assert_eq!(err.status_code(), 401);
}

#[test]
fn test_duplicate_tag_is_noop() {
    let err = DomainError::new("E", "m");
    err.add_tag("x").add_tag("x").add_tag("a");
    assert_eq!(err.tags(), vec!["a".to_string(), "x".to_string()]);
}
