//! Lazy stack-frame capture
//!
//! Frames are recorded only when an error is attached to another one
//! (`wrap`, `chain`, `with_cause`). The call site comes from
//! `#[track_caller]` or from an explicit [`CallSite`], usually produced by
//! the [`call_site!`](crate::call_site) macro.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::panic::Location;

use crate::pool::FramePool;

/// Frame message used by `with_cause`
pub const WRAPPED_FRAME_MESSAGE: &str = "wrapped error";
/// Prefix of the frame message used by `chain`
pub const CHAINED_FRAME_PREFIX: &str = "Chained error: ";
/// Function name recorded when only file and line are known
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// One recorded provenance entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl StackFrame {
    /// Overwrite this frame in place, reusing its string buffers
    pub(crate) fn fill(&mut self, site: &CallSite, message: &str) {
        self.function.clear();
        self.function.push_str(short_function(site.function));
        self.file.clear();
        self.file.push_str(short_file(site.file));
        self.line = site.line;
        self.message.clear();
        self.message.push_str(message);
    }

    pub(crate) fn clear(&mut self) {
        self.function.clear();
        self.file.clear();
        self.line = 0;
        self.message.clear();
    }
}

/// Where a frame was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    pub const fn new(function: &'static str, file: &'static str, line: u32) -> Self {
        Self {
            function,
            file,
            line,
        }
    }

    /// File and line of the caller; the function name is not available
    /// through `Location` and is recorded as [`UNKNOWN_FUNCTION`].
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(UNKNOWN_FUNCTION, location.file(), location.line())
    }
}

/// Build a [`CallSite`] for the current position, including the name of the
/// enclosing function.
///
/// ```
/// let site = faultline_errors::call_site!();
/// assert!(site.function.ends_with("main") || site.function.contains("rust_out"));
/// assert!(site.line > 0);
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __here() {}
        fn __name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __name_of(__here);
        $crate::stack::CallSite::new(
            name.strip_suffix("::__here").unwrap_or(name),
            file!(),
            line!(),
        )
    }};
}

/// Last `::` segment of a function path
pub fn short_function(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Last path segment of a file name, for either separator
pub fn short_file(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Append a frame describing `message` at `site`
pub(crate) fn capture_frame(
    stack: &mut Vec<StackFrame>,
    frames: Option<&FramePool>,
    site: &CallSite,
    message: &str,
) {
    let mut frame = frames.map(FramePool::acquire).unwrap_or_default();
    frame.fill(site, message);
    stack.push(frame);
}

/// Numbered, two-line-per-frame rendering used by `format_stack_trace`
pub fn format_frames(frames: &[StackFrame]) -> String {
    let mut out = String::new();
    for (i, frame) in frames.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}\n   at {} ({}:{})",
            i + 1,
            frame.message,
            frame.function,
            frame.file,
            frame.line
        );
    }
    out
}
