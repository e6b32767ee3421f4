//! Stateless Gregorian calendar arithmetic.
//!
//! Everything here is a pure function of its arguments. The first weekday
//! is always passed in explicitly; there is no global "first day of week".

use chrono::{Datelike, NaiveDate, Weekday};

use crate::date::MonthKey;

/// Number of days in a week (and columns in a month grid).
pub const DAYS_IN_WEEK: usize = 7;

/// Fewest rows a month can occupy (28 days starting on the anchor day).
pub const MIN_WEEKS_IN_MONTH: usize = 4;

/// Most rows a month can occupy, and the fixed height of every grid.
pub const MAX_WEEKS_IN_MONTH: usize = 6;

/// Weekdays in calendar order, starting from Sunday.
const WEEKDAYS_FROM_SUNDAY: [Weekday; DAYS_IN_WEEK] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Number of days in `month`, 28 to 31.
///
/// Computed from the distance between the first day of this month and the
/// first day of the next one, so leap years follow the calendar rules.
///
/// # Panics
///
/// Panics if `month` is outside [`MonthKey::MIN_YEAR`]..=[`MonthKey::MAX_YEAR`]
/// by more than chrono can represent; check [`MonthKey::is_supported`] first.
pub fn days_in_month(month: MonthKey) -> u32 {
    let first = first_of_month(month);
    let next = first_of_month(month.next());
    next.signed_duration_since(first).num_days() as u32
}

/// The month before `month`, with year rollover at January.
pub const fn previous_month(month: MonthKey) -> MonthKey {
    month.previous()
}

/// The month after `month`, with year rollover at December.
pub const fn next_month(month: MonthKey) -> MonthKey {
    month.next()
}

/// Whether `year` is a Gregorian leap year.
pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Column index (0-6) of `weekday` when weeks start on `first_weekday`.
pub fn weekday_index(weekday: Weekday, first_weekday: Weekday) -> usize {
    let first = first_weekday.num_days_from_sunday();
    let this = weekday.num_days_from_sunday();
    ((this + 7 - first) % 7) as usize
}

/// Column index (0-6) of `date` when weeks start on `first_weekday`.
pub fn weekday_index_of(date: NaiveDate, first_weekday: Weekday) -> usize {
    weekday_index(date.weekday(), first_weekday)
}

/// Calendar weekday shown in `column` when weeks start on `first_weekday`.
pub fn weekday_at(column: usize, first_weekday: Weekday) -> Weekday {
    let first = first_weekday.num_days_from_sunday() as usize;
    WEEKDAYS_FROM_SUNDAY[(column + first) % DAYS_IN_WEEK]
}

/// Weekday header order for weeks starting on `first_weekday`.
pub fn weekday_order(first_weekday: Weekday) -> [Weekday; DAYS_IN_WEEK] {
    std::array::from_fn(|column| weekday_at(column, first_weekday))
}

/// Weekend is always calendar Saturday and Sunday, whatever the anchor.
pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Rows needed to hold `days` days starting at column `first_day_index`.
pub fn weeks_needed(first_day_index: usize, days: u32) -> usize {
    (first_day_index + days as usize).div_ceil(DAYS_IN_WEEK)
}

pub(crate) fn first_of_month(month: MonthKey) -> NaiveDate {
    month
        .first_day()
        .unwrap_or_else(|| panic!("month {month} is outside the supported calendar range"))
}
