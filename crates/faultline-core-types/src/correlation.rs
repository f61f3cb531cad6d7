//! Correlation identifiers carried on errors
//!
//! Errors built while serving a request can be tagged with the request and
//! trace identifiers so log sinks and API responses can be joined back to the
//! originating call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{META_REQUEST_ID, META_TRACE_ID};

macro_rules! correlation_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh identifier (UUIDv7, time ordered)
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::generate()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// Identifier of the request during which an error was produced
    RequestId
);

correlation_id!(
    /// Distributed trace identifier propagated across service boundaries
    TraceId
);

/// Correlation data for one unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
}

impl RequestContext {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Metadata entries describing this context, keyed by the canonical
    /// metadata keys. The trace entry is present only when a trace is set.
    pub fn metadata_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(META_REQUEST_ID, self.request_id.to_string())];
        if let Some(trace_id) = &self.trace_id {
            pairs.push((META_TRACE_ID, trace_id.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
        assert_ne!(TraceId::generate(), TraceId::generate());
    }

    #[test]
    fn test_id_from_existing_value() {
        let id = RequestId::from("req-42");
        assert_eq!(id.as_str(), "req-42");
        assert_eq!(id.to_string(), "req-42");
    }

    #[test]
    fn test_metadata_pairs_without_trace() {
        let ctx = RequestContext::new(RequestId::from("r1"));
        assert_eq!(ctx.metadata_pairs(), vec![("request_id", "r1".to_string())]);
    }

    #[test]
    fn test_metadata_pairs_with_trace() {
        let ctx = RequestContext::new(RequestId::from("r1")).with_trace_id(TraceId::from("t1"));
        let pairs = ctx.metadata_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("trace_id", "t1".to_string()));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = TraceId::from("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: TraceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
