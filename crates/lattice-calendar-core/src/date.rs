//! Value types for calendar dates and months.
//!
//! [`DateItem`] is a plain `(year, month, day)` triple as produced by the
//! calendar math, and [`MonthKey`] identifies one month page. Both are
//! `Copy`, totally ordered and hashable so they can key the page map.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Number of months in a year.
pub const MONTHS_IN_YEAR: u32 = 12;

/// Largest day number a date may carry before validation against its month.
pub const MAX_DAYS_IN_MONTH: u32 = 31;

/// Smallest year accepted for an initial date.
pub const MIN_INITIAL_YEAR: i32 = 1970;

/// A calendar date as a `(year, month, day)` triple.
///
/// A `DateItem` is *valid* when `year >= 1970`, `1 <= month <= 12` and
/// `1 <= day <= 31`. The predicate is structural only: February 31st passes
/// it. Dates produced by grid construction always exist in the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateItem {
    pub year: i32,
    /// Value from 1 to 12.
    pub month: u32,
    pub day: u32,
}

impl DateItem {
    /// Create a new date item. No validation is performed.
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Today's date on the local clock.
    pub fn today() -> Self {
        Self::from_naive(Local::now().date_naive())
    }

    /// Convert from a chrono date.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// Convert to a chrono date, if this triple names a real calendar day.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// Check the structural validity predicate.
    pub fn is_valid(&self) -> bool {
        self.year >= MIN_INITIAL_YEAR
            && (1..=MONTHS_IN_YEAR).contains(&self.month)
            && (1..=MAX_DAYS_IN_MONTH).contains(&self.day)
    }

    /// The month this date belongs to.
    pub fn month_key(&self) -> MonthKey {
        MonthKey {
            year: self.year,
            month: self.month,
        }
    }

    /// Calendar weekday of this date, if it exists.
    pub fn weekday(&self) -> Option<Weekday> {
        self.to_naive().map(|date| date.weekday())
    }
}

impl From<NaiveDate> for DateItem {
    fn from(date: NaiveDate) -> Self {
        Self::from_naive(date)
    }
}

impl fmt::Display for DateItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Identifies one month page: `(year, month)`.
///
/// Ordering is by year, then month. Equality compares both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// Value from 1 to 12.
    pub month: u32,
}

impl MonthKey {
    /// First year the calendar backend is asked to represent.
    pub const MIN_YEAR: i32 = 1;
    /// Last year the calendar backend is asked to represent.
    pub const MAX_YEAR: i32 = 9999;

    /// Create a month key.
    ///
    /// `month` must be in `1..=12`; violating this is a logic error.
    pub const fn new(year: i32, month: u32) -> Self {
        debug_assert!(month >= 1 && month <= MONTHS_IN_YEAR);
        Self { year, month }
    }

    /// Create a month key, returning `None` if `month` is out of range.
    pub const fn try_new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= MONTHS_IN_YEAR {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Whether grids can be built for this month.
    ///
    /// The neighbouring months must be representable too, since their days
    /// fill the in/out cells.
    pub fn is_supported(&self) -> bool {
        (Self::MIN_YEAR..=Self::MAX_YEAR).contains(&self.year)
            && (1..=MONTHS_IN_YEAR).contains(&self.month)
    }

    /// The month before this one, rolling the year over at January.
    pub const fn previous(&self) -> Self {
        if self.month <= 1 {
            Self {
                year: self.year - 1,
                month: MONTHS_IN_YEAR,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The month after this one, rolling the year over at December.
    pub const fn next(&self) -> Self {
        if self.month >= MONTHS_IN_YEAR {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The month `months` steps away, negative steps going back in time.
    ///
    /// Returns `None` if the year would overflow.
    pub fn offset(&self, months: i64) -> Option<Self> {
        let index = i64::from(self.year) * i64::from(MONTHS_IN_YEAR) + i64::from(self.month) - 1;
        let shifted = index.checked_add(months)?;
        let year = i32::try_from(shifted.div_euclid(i64::from(MONTHS_IN_YEAR))).ok()?;
        let month = shifted.rem_euclid(i64::from(MONTHS_IN_YEAR)) as u32 + 1;
        Some(Self { year, month })
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: &MonthKey) -> i64 {
        (i64::from(other.year) - i64::from(self.year)) * i64::from(MONTHS_IN_YEAR)
            + i64::from(other.month)
            - i64::from(self.month)
    }

    /// The first day of this month as a chrono date.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// A date in this month.
    pub const fn date(&self, day: u32) -> DateItem {
        DateItem::new(self.year, self.month, day)
    }

    /// Whether `date` belongs to this month.
    pub fn contains(&self, date: &DateItem) -> bool {
        date.year == self.year && date.month == self.month
    }
}

impl From<DateItem> for MonthKey {
    fn from(date: DateItem) -> Self {
        date.month_key()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
