//! Canonical logging macros
//!
//! Every macro stamps `component`, `op` and `event` so events can be filtered
//! and asserted on uniformly. Field keys come from
//! `faultline_core_types::schema`.

/// Shared expansion: one event at `$level` tagged with `op` and `event`
#[doc(hidden)]
#[macro_export]
macro_rules! __log_op {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        $crate::__tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use faultline_logging::log_op_start;
/// log_op_start!("import_batch");
/// log_op_start!("import_batch", batch_size = 10);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(info, $op, $crate::__core_types::schema::EVENT_START $(, $($field)*)?)
    };
}

/// Log the successful end of an operation; `duration_ms` is required
///
/// ```
/// # use faultline_logging::log_op_end;
/// log_op_end!("import_batch", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(
            info,
            $op,
            $crate::__core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log a failed operation with the classification of its error
///
/// `$err` is any value exposing `code()`, `kind()` and `severity()` with
/// `Display` results, which covers `DomainError` and `ValidationError`.
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let err = &$err;
        $crate::__log_op!(
            error,
            $op,
            $crate::__core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.code = %err.code(),
            err.kind = %err.kind(),
            err.severity = %err.severity()
            $(, $($field)*)?
        )
    }};
}

/// Debug-level lifecycle event, such as a pool dropping an instance or a
/// traversal stopping on a cycle
///
/// ```
/// # use faultline_logging::log_op_event;
/// log_op_event!("pool.release", "discarded");
/// log_op_event!("pool.release", "discarded", pool.idle = 64);
/// ```
#[macro_export]
macro_rules! log_op_event {
    ($op:expr, $event:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(debug, $op, $event $(, $($field)*)?)
    };
}
