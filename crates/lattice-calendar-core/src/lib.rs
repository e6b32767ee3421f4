//! Core systems for Lattice Calendar.
//!
//! This crate provides the foundational pieces of the Lattice Calendar engine:
//!
//! - **Dates**: [`DateItem`] and [`MonthKey`], with month arithmetic
//! - **Calendar Math**: weekday columns, month lengths, week counts
//! - **Month Grids**: the fixed 6×7 day grid of a month, with in/out days
//! - **Signal/Slot System**: change notification for selection and paging
//! - **Worker**: a serial background thread for pagination jobs
//!
//! # Month Grid Example
//!
//! ```
//! use chrono::Weekday;
//! use lattice_calendar_core::{build_month_grid, MonthKey};
//!
//! // February 2015 starts on a Sunday and fits exactly four weeks.
//! let grid = build_month_grid(MonthKey::new(2015, 2), Weekday::Sun, None).unwrap();
//! assert_eq!(grid.weeks_count(), 4);
//! assert_eq!(grid.previous_inout_count(), 0);
//! assert!(grid.is_full_next_inout_week());
//! ```
//!
//! # Signal/Slot Example
//!
//! ```
//! use lattice_calendar_core::{DateItem, Signal};
//!
//! let day_tapped = Signal::<DateItem>::new();
//! let conn_id = day_tapped.connect(|date| {
//!     println!("tapped {date}");
//! });
//!
//! day_tapped.emit(DateItem::new(2017, 3, 17));
//! day_tapped.disconnect(conn_id);
//! ```

mod date;
mod error;
mod grid;
pub mod logging;
pub mod math;
pub mod signal;
pub mod worker;

pub use date::{DateItem, MonthKey, MAX_DAYS_IN_MONTH, MIN_INITIAL_YEAR, MONTHS_IN_YEAR};
pub use error::{CalendarError, IndexError, InitError, Result};
pub use grid::{build_month_grid, Day, DayKind, MonthGrid, Week, GRID_CELLS};
pub use logging::PerfSpan;
pub use math::{
    days_in_month, is_leap_year, is_weekend, next_month, previous_month, weekday_at,
    weekday_index, weekday_index_of, weekday_order, weeks_needed, DAYS_IN_WEEK,
    MAX_WEEKS_IN_MONTH, MIN_WEEKS_IN_MONTH,
};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use worker::{Worker, WorkerConfig};

// Re-export chrono types that appear in the public API
pub use chrono::Weekday;
