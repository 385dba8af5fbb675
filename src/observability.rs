//! Logging infrastructure for cellscan.
//!
//! cellscan uses `tracing` for structured logging. All events use target
//! "cellscan" and include `component` and `event` fields for filtering.
//!
//! ## Library Integration
//!
//! cellscan never initializes a global subscriber. Applications configure
//! tracing via `tracing_subscriber` or similar.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (e.g., "reader", "delete", "context")
//! - Use `%` for Display, `?` for Debug formatting
//! - Per-cell events are trace level only

/// Target for all cellscan log events.
pub(crate) const CELLSCAN_TARGET: &str = "cellscan";

/// Macro for debug-level log events.
///
/// # Example
/// ```ignore
/// log_debug!(
///     component = "reader",
///     event = "reader_opened",
///     variant = %source.name(),
/// );
/// ```
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::CELLSCAN_TARGET, $($field)*)
    };
}

/// Macro for trace-level log events.
macro_rules! log_trace {
    ($($field:tt)*) => {
        ::tracing::trace!(target: $crate::observability::CELLSCAN_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::CELLSCAN_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
pub(crate) use log_warn;
