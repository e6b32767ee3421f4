//! Error types for Lattice Calendar.
//!
//! Caller mistakes are split into two recoverable kinds: [`InitError`] for
//! a bad initial date (or a month the calendar cannot represent) and
//! [`IndexError`] for malformed page queries. Broken calendar invariants
//! are programming defects and are not part of this taxonomy.

use crate::date::{DateItem, MonthKey};

/// Result type alias for calendar operations.
pub type Result<T> = std::result::Result<T, CalendarError>;

/// Errors raised while (re)initializing a month window or building a grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// The initial date failed the validity predicate.
    #[error("invalid initial date {0}: year must be >= 1970, month 1-12 and day 1-31")]
    InvalidDate(DateItem),

    /// The calendar backend cannot represent this month.
    #[error("month {0} is outside the supported calendar range")]
    UnsupportedMonth(MonthKey),
}

/// Errors raised by page visibility queries with malformed arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Page size must be strictly positive.
    #[error("page size must be greater than 0, got {0}")]
    InvalidPageSize(i64),

    /// Overscan must not be negative.
    #[error("overscan must be greater than or equal to 0, got {0}")]
    NegativeOverscan(i64),

    /// No resident month falls on the requested page.
    #[error("page {page} has no visible months")]
    NoVisiblePages {
        /// The requested page index.
        page: i64,
    },
}

/// The umbrella error type for Lattice Calendar.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// Initialization error.
    #[error(transparent)]
    Init(#[from] InitError),

    /// Page index error.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The worker thread no longer accepts jobs.
    #[error("the pagination worker has been stopped")]
    WorkerStopped,

    /// The worker queue is full.
    #[error("the pagination worker queue is full")]
    WorkerBusy,

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread '{name}': {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl CalendarError {
    /// Create a worker spawn error.
    pub fn worker_spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::WorkerSpawn {
            name: name.into(),
            source,
        }
    }

    /// Returns `true` if this error was caused by a bad initial date or month.
    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}
