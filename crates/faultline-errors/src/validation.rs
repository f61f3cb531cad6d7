//! Validation errors: a domain error plus ordered per-field messages

use parking_lot::RwLock;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::builder::CODE_VALIDATION;
use crate::cause::{Cause, InheritedContext, MetadataCarrier};
use crate::domain::DomainError;
use crate::pool::FramePool;
use crate::taxonomy::ErrorType;

/// Field name to messages, in first-insertion order
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message, creating the field entry on first use
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    /// Append several messages to one field
    pub fn append(&mut self, field: impl Into<String>, messages: Vec<String>) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => existing.extend(messages),
            None => self.entries.push((field, messages)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of messages across all fields
    pub fn total_messages(&self) -> usize {
        self.entries.iter().map(|(_, messages)| messages.len()).sum()
    }

    /// First message of the first field that has one
    pub fn first_message(&self) -> Option<&str> {
        self.entries
            .iter()
            .find_map(|(_, messages)| messages.first())
            .map(String::as_str)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K, V> FromIterator<(K, Vec<V>)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Vec<V>)>>(iter: I) -> Self {
        let mut fields = FieldMap::new();
        for (field, messages) in iter {
            fields.append(field, messages.into_iter().map(Into::into).collect());
        }
        fields
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FieldMapVisitor)
    }
}

struct FieldMapVisitor;

impl<'de> Visitor<'de> for FieldMapVisitor {
    type Value = FieldMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to message lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<FieldMap, A::Error> {
        let mut fields = FieldMap::new();
        while let Some((field, messages)) = access.next_entry::<String, Vec<String>>()? {
            fields.append(field, messages);
        }
        Ok(fields)
    }
}

/// A [`DomainError`] with per-field validation messages
///
/// Derefs to its core, so every core accessor and setter is available
/// directly. Rendering and JSON are its own.
pub struct ValidationError {
    core: DomainError,
    fields: RwLock<FieldMap>,
}

impl ValidationError {
    /// Unpooled validation error with code `VALIDATION_ERROR`
    pub fn new(message: impl Into<String>, fields: FieldMap) -> Self {
        let err = Self::blank(None);
        err.init(message.into(), fields);
        err
    }

    pub(crate) fn blank(frames: Option<Arc<FramePool>>) -> Self {
        Self {
            core: DomainError::blank(frames),
            fields: RwLock::new(FieldMap::new()),
        }
    }

    pub(crate) fn init(&self, message: String, fields: FieldMap) {
        {
            let mut state = self.core.state_mut();
            state.code.clear();
            state.code.push_str(CODE_VALIDATION);
            state.message = message;
            state.apply_type(ErrorType::Validation);
        }
        self.replace_fields(fields);
    }

    pub(crate) fn replace_fields(&self, fields: FieldMap) {
        *self.fields.write() = fields;
    }

    pub(crate) fn recycle(&mut self, frames: &Arc<FramePool>) {
        self.core.recycle(frames);
        self.fields.get_mut().clear();
    }

    pub fn core(&self) -> &DomainError {
        &self.core
    }

    pub fn add_field(&self, field: impl Into<String>, message: impl Into<String>) -> &Self {
        self.fields.write().push(field, message);
        self
    }

    /// Independent copy of every field and its messages
    pub fn fields(&self) -> FieldMap {
        self.fields.read().clone()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.read().contains(field)
    }

    /// Messages for `field`; empty when the field has none
    pub fn field_errors(&self, field: &str) -> Vec<String> {
        self.fields
            .read()
            .get(field)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    pub fn total_errors(&self) -> usize {
        self.fields.read().total_messages()
    }

    /// First message in insertion order
    pub fn first_error(&self) -> Option<String> {
        self.fields.read().first_message().map(str::to_string)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.read().names()
    }

    /// True when no field carries a message
    pub fn is_empty(&self) -> bool {
        self.fields.read().total_messages() == 0
    }

    /// Append every message of `other` after the existing ones
    pub fn merge(&self, other: &ValidationError) -> &Self {
        let incoming = other.fields();
        let mut fields = self.fields.write();
        for (field, messages) in incoming {
            fields.append(field, messages);
        }
        self
    }

    /// Rename every field to `prefix.field`. Repeated calls stack prefixes.
    pub fn with_field_prefix(&self, prefix: &str) -> &Self {
        let mut fields = self.fields.write();
        let renamed = std::mem::take(&mut *fields)
            .into_iter()
            .map(|(field, messages)| (format!("{prefix}.{field}"), messages))
            .collect::<Vec<_>>();
        *fields = FieldMap { entries: renamed };
        self
    }
}

impl Deref for ValidationError {
    type Target = DomainError;

    fn deref(&self) -> &DomainError {
        &self.core
    }
}

impl Clone for ValidationError {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            fields: RwLock::new(self.fields()),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.core, f)?;
        let fields = self.fields();
        if fields.is_empty() {
            return Ok(());
        }
        f.write_str(" (")?;
        for (i, (field, messages)) in fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationError")
            .field("core", &self.core)
            .field("fields", &self.fields())
            .finish()
    }
}

impl StdError for ValidationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.core.source()
    }
}

impl MetadataCarrier for ValidationError {
    fn details(&self) -> HashMap<String, Value> {
        self.core.details()
    }

    fn metadata(&self) -> HashMap<String, Value> {
        self.core.metadata()
    }

    fn tags(&self) -> Vec<String> {
        self.core.tags()
    }

    fn headers(&self) -> HashMap<String, String> {
        self.core.headers()
    }

    fn snapshot(&self) -> InheritedContext {
        self.core.snapshot()
    }
}

impl From<Arc<ValidationError>> for Cause {
    fn from(err: Arc<ValidationError>) -> Self {
        Cause::with_carrier(err)
    }
}

impl From<ValidationError> for Cause {
    fn from(err: ValidationError) -> Self {
        Cause::with_carrier(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Severity;

    fn email_required() -> ValidationError {
        ValidationError::new("invalid input", [("email", vec!["required"])].into_iter().collect())
    }

    #[test]
    fn test_new_sets_validation_identity() {
        let err = email_required();
        assert_eq!(err.code(), CODE_VALIDATION);
        assert_eq!(err.error_type(), Some(ErrorType::Validation));
        assert_eq!(err.severity(), Severity::Low);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let err = ValidationError::new("bad", FieldMap::new());
        err.add_field("zip", "too short");
        err.add_field("age", "negative");
        err.add_field("zip", "not numeric");
        assert_eq!(err.field_names(), vec!["zip".to_string(), "age".to_string()]);
        assert_eq!(err.field_errors("zip"), vec!["too short", "not numeric"]);
        assert_eq!(err.first_error().as_deref(), Some("too short"));
        assert_eq!(err.total_errors(), 3);
    }

    #[test]
    fn test_fields_returns_copy() {
        let err = email_required();
        let mut copy = err.fields();
        copy.push("name", "required");
        assert!(!err.has_field("name"));
    }

    #[test]
    fn test_display_lists_fields() {
        let err = email_required();
        err.add_field("email", "malformed");
        err.add_field("age", "negative");
        assert_eq!(
            err.to_string(),
            "[VALIDATION_ERROR] invalid input (email: required, malformed; age: negative)"
        );
        let empty = ValidationError::new("nothing", FieldMap::new());
        assert_eq!(empty.to_string(), "[VALIDATION_ERROR] nothing");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_merge_appends_after_existing() {
        let a = email_required();
        let b = ValidationError::new("other", FieldMap::new());
        b.add_field("email", "taken");
        b.add_field("name", "required");
        a.merge(&b);
        assert_eq!(a.field_errors("email"), vec!["required", "taken"]);
        assert_eq!(a.field_names(), vec!["email".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_merge_with_itself_doubles_messages() {
        let a = email_required();
        a.merge(&a);
        assert_eq!(a.field_errors("email"), vec!["required", "required"]);
    }

    #[test]
    fn test_prefix_compounds() {
        let err = email_required();
        err.with_field_prefix("user");
        assert!(err.has_field("user.email"));
        err.with_field_prefix("request");
        assert_eq!(err.field_names(), vec!["request.user.email".to_string()]);
    }

    #[test]
    fn test_field_map_json_preserves_order() {
        let mut fields = FieldMap::new();
        fields.push("zeta", "z");
        fields.push("alpha", "a");
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"zeta":["z"],"alpha":["a"]}"#);
        let back: FieldMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }
}
