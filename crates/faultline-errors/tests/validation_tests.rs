#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::shared;
use faultline_errors::{DomainError, FieldMap, JsonRender, ValidationError};
use std::sync::Arc;

fn signup_errors() -> ValidationError {
    ValidationError::new(
        "signup rejected",
        [
            ("email", vec!["required", "malformed"]),
            ("password", vec!["too short"]),
        ]
        .into_iter()
        .collect(),
    )
}

#[test]
fn test_field_queries() {
    let err = signup_errors();
    assert!(err.has_field("email"));
    assert!(!err.has_field("name"));
    assert_eq!(err.field_errors("email"), vec!["required", "malformed"]);
    assert!(err.field_errors("name").is_empty());
    assert_eq!(err.total_errors(), 3);
    assert_eq!(err.first_error().as_deref(), Some("required"));
    assert_eq!(err.field_names(), vec!["email".to_string(), "password".to_string()]);
    assert!(!err.is_empty());
}

#[test]
fn test_display() {
    assert_eq!(
        signup_errors().to_string(),
        "[VALIDATION_ERROR] signup rejected (email: required, malformed; password: too short)"
    );
}

#[test]
fn test_json_shape_for_single_field() {
    let err = ValidationError::new("invalid", [("email", vec!["required"])].into_iter().collect());
    let text = err.to_json_string().unwrap();
    assert!(text.contains(r#""validated_fields":{"email":["required"]}"#));
    assert!(!text.contains("\"category\""));
    assert!(text.contains(r#""type":"VALIDATION""#));
    assert!(text.contains(r#""severity":"LOW""#));
}

#[test]
fn test_core_json_keeps_base_shape() {
    let err = signup_errors();
    let text = err.core().to_json_string().unwrap();
    assert!(text.contains(r#""category":"validation""#));
    assert!(!text.contains("validated_fields"));
}

#[test]
fn test_empty_fields_omitted_from_json() {
    let err = ValidationError::new("nothing yet", FieldMap::new());
    let text = err.to_json_string().unwrap();
    assert!(!text.contains("validated_fields"));
}

#[test]
fn test_merge_and_prefix() {
    let address = ValidationError::new("bad address", [("zip", vec!["required"])].into_iter().collect());
    address.with_field_prefix("address");

    let err = signup_errors();
    err.merge(&address);
    assert_eq!(
        err.field_names(),
        vec!["email".to_string(), "password".to_string(), "address.zip".to_string()]
    );

    err.with_field_prefix("user");
    assert!(err.has_field("user.address.zip"));
    assert_eq!(err.first_error().as_deref(), Some("required"));
}

#[test]
fn test_validation_as_cause_shares_context() {
    let invalid = Arc::new(signup_errors());
    invalid.add_detail("form", "signup").add_tag("user-input");
    let outer = DomainError::new("REQ_FAILED", "request failed");
    outer.wrap("validating", Some(invalid.clone()));
    assert!(outer.has_tag("user-input"));
    assert_eq!(outer.detail("form"), Some(serde_json::Value::from("signup")));
    assert!(outer.to_string().ends_with("(email: required, malformed; password: too short)"));
    let found = faultline_errors::find_in_chain::<ValidationError>(&outer).unwrap();
    assert_eq!(found.total_errors(), 3);
}

#[test]
fn test_validation_wraps_other_errors() {
    let err = signup_errors();
    err.wrap("lookup", Some(shared("DUP", "email taken")));
    assert_eq!(
        err.to_string(),
        "[VALIDATION_ERROR] signup rejected: [DUP] email taken (email: required, malformed; password: too short)"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_clone_copies_fields() {
    let err = signup_errors();
    let copy = err.clone();
    copy.add_field("name", "required");
    assert!(!err.has_field("name"));
    assert_eq!(copy.total_errors(), 4);
}
