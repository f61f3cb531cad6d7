//! JSON rendering and decoding
//!
//! Each error type renders its own fixed shape through [`JsonRender`]. The
//! stack is never part of the document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{DomainError, ErrorState};
use crate::errors::Result;
use crate::pool::ErrorPool;
use crate::taxonomy::{ErrorType, Severity};
use crate::validation::{FieldMap, ValidationError};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire shape of a [`DomainError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub temporary: bool,
}

/// Wire shape of a [`ValidationError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPayload {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub validated_fields: FieldMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Types with a fixed JSON document shape
pub trait JsonRender {
    type Payload: Serialize;

    /// Snapshot of the value in wire form
    fn payload(&self) -> Self::Payload;

    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload())?)
    }

    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.payload())?)
    }
}

impl JsonRender for DomainError {
    type Payload = ErrorPayload;

    fn payload(&self) -> ErrorPayload {
        let state = self.state();
        ErrorPayload {
            code: state.code.clone(),
            message: state.message.clone(),
            error_type: state.kind(),
            severity: state.severity,
            category: state.category.clone(),
            details: state.details.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            tags: state.sorted_tags(),
            timestamp: state.timestamp,
            retryable: state.effective_retryable(),
            temporary: state.effective_temporary(),
        }
    }
}

impl JsonRender for ValidationError {
    type Payload = ValidationPayload;

    fn payload(&self) -> ValidationPayload {
        let validated_fields = self.fields();
        let state = self.core().state();
        ValidationPayload {
            code: state.code.clone(),
            message: state.message.clone(),
            error_type: state.kind(),
            severity: state.severity,
            validated_fields,
            details: state.details.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            tags: state.sorted_tags(),
            timestamp: state.timestamp,
        }
    }
}

impl ErrorPayload {
    pub(crate) fn apply(self, state: &mut ErrorState) {
        state.code = self.code;
        state.message = self.message;
        state.error_type = Some(self.error_type);
        state.severity = self.severity;
        state.category = self.category;
        state.details = self.details.into_iter().collect();
        state.tags = self.tags.into_iter().collect();
        state.timestamp = self.timestamp;
        state.retryable = self.retryable;
        state.temporary = self.temporary;
    }
}

impl ValidationPayload {
    fn apply(self, err: &ValidationError) -> FieldMap {
        let mut state = err.core().state_mut();
        state.code = self.code;
        state.message = self.message;
        state.error_type = Some(self.error_type);
        state.severity = self.severity;
        state.category.clear();
        state.category.push_str(self.error_type.default_category());
        state.details = self.details.into_iter().collect();
        state.tags = self.tags.into_iter().collect();
        state.timestamp = self.timestamp;
        self.validated_fields
    }
}

pub(crate) fn decode_error(bytes: &[u8]) -> Result<ErrorPayload> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_validation(bytes: &[u8]) -> Result<ValidationPayload> {
    Ok(serde_json::from_slice(bytes)?)
}

impl DomainError {
    /// Rebuild an unpooled error from its JSON document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when `bytes` is not a valid error document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let payload = decode_error(bytes)?;
        let err = DomainError::blank(None);
        payload.apply(&mut err.state_mut());
        Ok(err)
    }
}

impl ValidationError {
    /// Rebuild an unpooled validation error from its JSON document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when `bytes` is not a valid document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let payload = decode_validation(bytes)?;
        let err = ValidationError::blank(None);
        let fields = payload.apply(&err);
        err.replace_fields(fields);
        Ok(err)
    }
}

impl ErrorPool {
    /// Decode a [`ValidationError`] into a pooled instance
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when `bytes` is not a valid document.
    pub fn validation_from_json(&self, bytes: &[u8]) -> Result<Arc<ValidationError>> {
        let payload = decode_validation(bytes)?;
        let err = self.acquire_validation();
        let fields = payload.apply(&err);
        err.replace_fields(fields);
        Ok(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_type_encodes_as_internal() {
        let err = DomainError::new("E1", "boom");
        let json: Value = serde_json::from_slice(&err.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "INTERNAL");
        assert_eq!(json["severity"], "MEDIUM");
        assert!(json.get("category").is_none());
        assert!(json.get("retryable").is_none());
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn test_details_and_tags_sorted() {
        let err = DomainError::new("E1", "boom");
        err.add_tag("b").add_tag("a");
        err.add_detail("zeta", 1).add_detail("alpha", 2);
        let text = err.to_json_string().unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
        assert!(text.contains(r#""tags":["a","b"]"#));
    }

    #[test]
    fn test_effective_flags_are_emitted() {
        let err = DomainError::new("T", "slow");
        err.set_type(ErrorType::Timeout);
        let json: Value = serde_json::from_slice(&err.to_json().unwrap()).unwrap();
        assert_eq!(json["retryable"], true);
        assert_eq!(json["temporary"], true);
    }

    #[test]
    fn test_round_trip() {
        let err = DomainError::new("E404", "missing");
        err.set_type(ErrorType::NotFound).set_severity(Severity::High);
        err.add_detail("id", 9).add_tag("lookup");
        let back = DomainError::from_json(&err.to_json().unwrap()).unwrap();
        assert_eq!(back.code(), "E404");
        assert_eq!(back.message(), "missing");
        assert_eq!(back.error_type(), Some(ErrorType::NotFound));
        assert_eq!(back.severity(), Severity::High);
        assert_eq!(back.detail("id"), Some(Value::from(9)));
        assert_eq!(back.timestamp(), err.timestamp());
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let err = DomainError::from_json(b"not json").unwrap_err();
        assert_eq!(err.code(), "ERR_SERIALIZATION");
    }

    #[test]
    fn test_validation_shape() {
        let err = ValidationError::new("invalid", [("email", vec!["required"])].into_iter().collect());
        let text = err.to_json_string().unwrap();
        assert!(text.contains(r#""validated_fields":{"email":["required"]}"#));
        assert!(!text.contains("\"category\""));
        assert!(!text.contains("\"retryable\""));
    }

    #[test]
    fn test_validation_round_trip_keeps_field_order() {
        let err = ValidationError::new("invalid", FieldMap::new());
        err.add_field("zip", "short").add_field("age", "negative");
        let back = ValidationError::from_json(&err.to_json().unwrap()).unwrap();
        assert_eq!(back.field_names(), vec!["zip".to_string(), "age".to_string()]);
        assert_eq!(back.code(), "VALIDATION_ERROR");
        assert_eq!(back.category(), "validation");
    }
}
