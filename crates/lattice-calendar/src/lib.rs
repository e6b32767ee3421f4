//! Lattice Calendar - the engine behind an infinitely scrollable month calendar.
//!
//! This is the main crate. It re-exports everything from
//! `lattice-calendar-core` and adds:
//!
//! - **Month Page Cache**: a sliding window of month grids addressed by page
//! - **Pagination**: background loading of months at either end of the window
//! - **Selection**: an ordered ledger of selected days and the tap policy
//! - **Settings**: TOML-backed calendar configuration
//!
//! # Example
//!
//! ```
//! use lattice_calendar::{DateItem, MonthPageCache, SelectionMode, Weekday};
//!
//! let cache = MonthPageCache::builder()
//!     .window_size(5)
//!     .first_weekday(Weekday::Mon)
//!     .selection_mode(SelectionMode::Multiple)
//!     .initial_date(DateItem::new(2017, 3, 1))
//!     .selected_days([DateItem::new(2016, 12, 24)])
//!     .build()
//!     .unwrap();
//!
//! cache.selection_changed().connect(|change| {
//!     if let Some(day) = change.selected {
//!         println!("selected {}", day.date);
//!     }
//! });
//!
//! let grid = cache.page_at(2).unwrap();
//! let day = *grid.day(&DateItem::new(2017, 3, 17)).unwrap();
//! cache.tap(&day);
//! assert_eq!(cache.selected_days().len(), 2);
//! ```

pub mod cache;
mod error;
pub mod pager;
pub mod selection;
pub mod settings;

pub use lattice_calendar_core::*;

pub use cache::{CacheConfig, CacheState, Clock, MonthPageCache, MonthPageCacheBuilder};
pub use error::{SettingsError, SettingsResult};
pub use pager::{PageDirection, PageOutcome, PageRequest, PageResult, WindowChange};
pub use selection::{DayPredicate, SelectionChange, SelectionLedger, SelectionMode, TapPolicy};
pub use settings::CalendarSettings;
