//! Canonical schema constants for structured logging and error metadata
//!
//! These constants keep field keys identical between the events emitted by
//! the error core and the assertions made against captured logs.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Error fields
pub const FIELD_ERR_CODE: &str = "err.code";
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_SEVERITY: &str = "err.severity";

// Pool fields
pub const FIELD_POOL_IDLE: &str = "pool.idle";
pub const FIELD_POOL_REFS: &str = "pool.refs";
pub const FIELD_POOL_KIND: &str = "pool.kind";
pub const FIELD_POOL_PREWARM: &str = "pool.prewarm";

// Well-known metadata keys attached to errors
pub const META_REQUEST_ID: &str = "request_id";
pub const META_TRACE_ID: &str = "trace_id";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_DISCARDED: &str = "discarded";
pub const EVENT_REJECTED: &str = "rejected";
pub const EVENT_CYCLE_DETECTED: &str = "cycle_detected";
pub const EVENT_DEFAULTED: &str = "defaulted";

// Canonical operation names
pub const OP_POOL_INIT: &str = "pool.init";
pub const OP_POOL_RELEASE: &str = "pool.release";
pub const OP_ROOT_CAUSE: &str = "error.root_cause";
pub const OP_BUILD: &str = "builder.build";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let events = [
            EVENT_START,
            EVENT_END,
            EVENT_END_ERROR,
            EVENT_DISCARDED,
            EVENT_REJECTED,
            EVENT_CYCLE_DETECTED,
            EVENT_DEFAULTED,
        ];
        for (i, a) in events.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &events[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_error_fields_share_prefix() {
        for key in [FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_ERR_SEVERITY] {
            assert!(key.starts_with("err."), "{key} should be namespaced");
        }
    }
}
