//! Logging facilities for Lattice Calendar.
//!
//! Lattice Calendar uses the `tracing` crate for instrumentation. To see
//! logs, install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_calendar=debug,lattice_calendar_core=trace")
//!     .init();
//! ```
//!
//! Grid construction logs at `trace`; window resets, page commits,
//! evictions and selection changes log at `debug`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "lattice_calendar_core";
    /// Month grid construction.
    pub const GRID: &str = "lattice_calendar_core::grid";
    /// Signal emission.
    pub const SIGNAL: &str = "lattice_calendar_core::signal";
    /// Serial worker thread.
    pub const WORKER: &str = "lattice_calendar_core::worker";
    /// Month page cache (window resets and queries).
    pub const CACHE: &str = "lattice_calendar::cache";
    /// Background pagination.
    pub const PAGER: &str = "lattice_calendar::pager";
    /// Selection ledger.
    pub const SELECTION: &str = "lattice_calendar::selection";
    /// Settings loading and validation.
    pub const SETTINGS: &str = "lattice_calendar::settings";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time batches of grid construction.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "lattice_calendar::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
