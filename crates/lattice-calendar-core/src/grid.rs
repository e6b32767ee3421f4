//! Month grid construction.
//!
//! A [`MonthGrid`] is a fixed 6×7 surface of [`Day`] cells for one month:
//! leading in/out days borrowed from the previous month, the month's own
//! days, then trailing in/out days from the next month until all six rows
//! are filled. [`MonthGrid::weeks_count`] is the minimal number of rows that
//! hold every current-month day; whether the renderer shows the padding rows
//! is its own decision.
//!
//! # Example
//!
//! ```
//! use chrono::Weekday;
//! use lattice_calendar_core::{build_month_grid, DayKind, MonthKey};
//!
//! let grid = build_month_grid(MonthKey::new(2017, 3), Weekday::Sun, None).unwrap();
//! assert_eq!(grid.first_day_index(), 3);
//! assert_eq!(grid.weeks_count(), 5);
//!
//! let first = grid.day_at(0, 3).unwrap();
//! assert_eq!(first.date.day, 1);
//! assert_eq!(first.kind, DayKind::Current);
//! ```

use chrono::Weekday;

use crate::date::{DateItem, MonthKey};
use crate::error::InitError;
use crate::logging::targets;
use crate::math::{
    days_in_month, first_of_month, is_weekend, weekday_at, weekday_index_of, weeks_needed,
    DAYS_IN_WEEK, MAX_WEEKS_IN_MONTH,
};

/// Total number of cells in a grid.
pub const GRID_CELLS: usize = DAYS_IN_WEEK * MAX_WEEKS_IN_MONTH;

/// Whether a cell shows a day of the grid's own month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayKind {
    /// Day from the month the grid displays.
    Current,
    /// Day from the previous or next month, shown to fill a row.
    InOut,
}

/// One cell of a month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Day {
    pub date: DateItem,
    /// Calendar weekday of `date`.
    pub weekday: Weekday,
    /// Column of this cell, relative to the grid's first weekday.
    pub weekday_index: usize,
    pub kind: DayKind,
    pub is_today: bool,
    pub is_selected: bool,
}

impl Day {
    fn new(
        date: DateItem,
        column: usize,
        first_weekday: Weekday,
        kind: DayKind,
        today: Option<DateItem>,
    ) -> Self {
        Self {
            date,
            weekday: weekday_at(column, first_weekday),
            weekday_index: column,
            kind,
            is_today: today == Some(date),
            is_selected: false,
        }
    }

    /// The month that owns this date (not necessarily the grid's month).
    pub fn month_key(&self) -> MonthKey {
        self.date.month_key()
    }

    /// Whether this is an in/out day borrowed from a neighbouring month.
    pub fn is_in_out(&self) -> bool {
        self.kind == DayKind::InOut
    }

    /// Saturday and Sunday, regardless of the grid's first weekday.
    pub fn is_weekend(&self) -> bool {
        is_weekend(self.weekday)
    }
}

/// A week row: seven optional cells.
pub type Week = [Option<Day>; DAYS_IN_WEEK];

/// The day grid of one month.
///
/// Grids are immutable except for the per-cell selection flag; a change of
/// today's marker produces a new grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    month: MonthKey,
    first_weekday: Weekday,
    weeks: [Week; MAX_WEEKS_IN_MONTH],
    first_day_index: usize,
    day_count: u32,
    weeks_count: usize,
    previous_inout_count: usize,
    next_inout_count: usize,
    today: Option<DateItem>,
}

/// Build the grid for `month` with weeks starting on `first_weekday`.
///
/// Cells whose date equals `today` are flagged with [`Day::is_today`],
/// in/out cells included.
///
/// # Errors
///
/// Returns [`InitError::UnsupportedMonth`] if the month (or one of its
/// neighbours) is outside the range the calendar can represent.
#[tracing::instrument(level = "trace", target = "lattice_calendar_core::grid", skip_all, fields(month = %month))]
pub fn build_month_grid(
    month: MonthKey,
    first_weekday: Weekday,
    today: Option<DateItem>,
) -> Result<MonthGrid, InitError> {
    if !month.is_supported() {
        return Err(InitError::UnsupportedMonth(month));
    }

    let first_day_index = weekday_index_of(first_of_month(month), first_weekday);
    let day_count = days_in_month(month);
    let mut weeks: [Week; MAX_WEEKS_IN_MONTH] = [[None; DAYS_IN_WEEK]; MAX_WEEKS_IN_MONTH];

    // Leading cells count backwards from the previous month's last day.
    let previous = month.previous();
    let previous_last = days_in_month(previous);
    for column in 0..first_day_index {
        let day = previous_last + 1 - (first_day_index - column) as u32;
        weeks[0][column] = Some(Day::new(
            previous.date(day),
            column,
            first_weekday,
            DayKind::InOut,
            today,
        ));
    }

    for day in 1..=day_count {
        let cell = first_day_index + day as usize - 1;
        let column = cell % DAYS_IN_WEEK;
        weeks[cell / DAYS_IN_WEEK][column] = Some(Day::new(
            month.date(day),
            column,
            first_weekday,
            DayKind::Current,
            today,
        ));
    }

    let weeks_count = weeks_needed(first_day_index, day_count);

    let next = month.next();
    let first_trailing = first_day_index + day_count as usize;
    for (offset, cell) in (first_trailing..GRID_CELLS).enumerate() {
        let column = cell % DAYS_IN_WEEK;
        weeks[cell / DAYS_IN_WEEK][column] = Some(Day::new(
            next.date(offset as u32 + 1),
            column,
            first_weekday,
            DayKind::InOut,
            today,
        ));
    }

    tracing::trace!(
        target: targets::GRID,
        first_day_index,
        weeks_count,
        day_count,
        "built month grid"
    );

    Ok(MonthGrid {
        month,
        first_weekday,
        weeks,
        first_day_index,
        day_count,
        weeks_count,
        previous_inout_count: first_day_index,
        next_inout_count: GRID_CELLS - first_trailing,
        today,
    })
}

impl MonthGrid {
    /// The month this grid displays.
    pub fn month(&self) -> MonthKey {
        self.month
    }

    /// The weekday shown in column 0.
    pub fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    /// All six rows of the grid.
    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    /// The first [`weeks_count`](Self::weeks_count) rows.
    pub fn visible_weeks(&self) -> &[Week] {
        &self.weeks[..self.weeks_count]
    }

    /// Column of the 1st of the month in row 0.
    pub fn first_day_index(&self) -> usize {
        self.first_day_index
    }

    /// Number of days in the grid's month.
    pub fn day_count(&self) -> u32 {
        self.day_count
    }

    /// Minimal number of rows holding every current-month day (4, 5 or 6).
    pub fn weeks_count(&self) -> usize {
        self.weeks_count
    }

    /// Leading in/out days from the previous month.
    pub fn previous_inout_count(&self) -> usize {
        self.previous_inout_count
    }

    /// Trailing in/out days from the next month, padding rows included.
    pub fn next_inout_count(&self) -> usize {
        self.next_inout_count
    }

    /// Trailing in/out days needed to complete the last current-month row.
    pub fn trailing_in_row(&self) -> usize {
        (DAYS_IN_WEEK - (self.first_day_index + self.day_count as usize) % DAYS_IN_WEEK)
            % DAYS_IN_WEEK
    }

    pub fn is_full_previous_inout_week(&self) -> bool {
        self.previous_inout_count >= DAYS_IN_WEEK
    }

    pub fn is_full_next_inout_week(&self) -> bool {
        self.next_inout_count >= DAYS_IN_WEEK
    }

    /// The today marker this grid was built with.
    pub fn today(&self) -> Option<DateItem> {
        self.today
    }

    /// The cell at `row`, `column`, if populated.
    pub fn day_at(&self, row: usize, column: usize) -> Option<&Day> {
        self.weeks.get(row)?.get(column)?.as_ref()
    }

    /// Iterate all populated cells in row-major order.
    pub fn days(&self) -> impl Iterator<Item = &Day> {
        self.weeks.iter().flatten().flatten()
    }

    /// Iterate the cells of the grid's own month.
    pub fn current_days(&self) -> impl Iterator<Item = &Day> {
        self.days().filter(|day| day.kind == DayKind::Current)
    }

    /// Iterate the cells currently flagged as selected.
    pub fn selected_days(&self) -> impl Iterator<Item = &Day> {
        self.days().filter(|day| day.is_selected)
    }

    /// Row and column of the cell showing `date`, if the grid contains it.
    ///
    /// A date occurs at most once per grid.
    pub fn position_of(&self, date: &DateItem) -> Option<(usize, usize)> {
        if self.month.contains(date) {
            if date.day == 0 || date.day > self.day_count {
                return None;
            }
            let cell = self.first_day_index + date.day as usize - 1;
            return Some((cell / DAYS_IN_WEEK, cell % DAYS_IN_WEEK));
        }

        let rows = if self.month.previous().contains(date) {
            0..1
        } else if self.month.next().contains(date) {
            self.weeks_count.saturating_sub(1)..MAX_WEEKS_IN_MONTH
        } else {
            return None;
        };

        rows.flat_map(|row| (0..DAYS_IN_WEEK).map(move |column| (row, column)))
            .find(|&(row, column)| {
                self.weeks[row][column].is_some_and(|day| day.date == *date)
            })
    }

    /// The cell showing `date`, if any.
    pub fn day(&self, date: &DateItem) -> Option<&Day> {
        let (row, column) = self.position_of(date)?;
        self.day_at(row, column)
    }

    /// Whether some cell of this grid shows `date`.
    pub fn contains(&self, date: &DateItem) -> bool {
        self.position_of(date).is_some()
    }

    /// Set the selection flag of the cell showing `date`.
    ///
    /// Returns `true` if a cell changed.
    pub fn set_selected(&mut self, date: &DateItem, selected: bool) -> bool {
        let Some((row, column)) = self.position_of(date) else {
            return false;
        };
        match &mut self.weeks[row][column] {
            Some(day) if day.is_selected != selected => {
                day.is_selected = selected;
                true
            }
            _ => false,
        }
    }

    /// Clear every selection flag. Returns the number of cells changed.
    pub fn clear_selection(&mut self) -> usize {
        let mut cleared = 0;
        for day in self.weeks.iter_mut().flatten().flatten() {
            if day.is_selected {
                day.is_selected = false;
                cleared += 1;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const ANCHORS: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    fn grid(year: i32, month: u32, first_weekday: Weekday) -> MonthGrid {
        build_month_grid(MonthKey::new(year, month), first_weekday, None).unwrap()
    }

    #[test]
    fn test_march_2017_sunday() {
        let grid = grid(2017, 3, Weekday::Sun);
        assert_eq!(grid.first_day_index(), 3);
        assert_eq!(grid.weeks_count(), 5);
        assert_eq!(grid.previous_inout_count(), 3);
        assert_eq!(grid.next_inout_count(), 8);
        assert_eq!(grid.trailing_in_row(), 1);
        assert!(grid.is_full_next_inout_week());
        assert!(!grid.is_full_previous_inout_week());

        let leading: Vec<u32> = grid.weeks()[0][..3]
            .iter()
            .map(|cell| cell.unwrap().date.day)
            .collect();
        assert_eq!(leading, vec![26, 27, 28]);
        assert!(grid.weeks()[0][..3]
            .iter()
            .all(|cell| cell.unwrap().date.month == 2 && cell.unwrap().is_in_out()));

        // Last current day is Friday the 31st, April 1st completes the row.
        let last = grid.day_at(4, 5).unwrap();
        assert_eq!(last.date, DateItem::new(2017, 3, 31));
        let trailing = grid.day_at(4, 6).unwrap();
        assert_eq!(trailing.date, DateItem::new(2017, 4, 1));
        assert_eq!(trailing.kind, DayKind::InOut);
        assert_eq!(grid.day_at(5, 6).unwrap().date, DateItem::new(2017, 4, 8));
    }

    #[test]
    fn test_month_starting_on_anchor() {
        // February 2015 starts on Sunday and has exactly four rows.
        let grid = grid(2015, 2, Weekday::Sun);
        assert_eq!(grid.first_day_index(), 0);
        assert_eq!(grid.previous_inout_count(), 0);
        assert_eq!(grid.weeks_count(), 4);
        assert_eq!(grid.trailing_in_row(), 0);
        assert_eq!(grid.next_inout_count(), 14);
        assert_eq!(grid.day_at(0, 0).unwrap().date, DateItem::new(2015, 2, 1));
        assert_eq!(grid.day_at(4, 0).unwrap().date, DateItem::new(2015, 3, 1));
    }

    #[test]
    fn test_six_week_month() {
        // July 2017 starts on Saturday.
        let grid = grid(2017, 7, Weekday::Sun);
        assert_eq!(grid.first_day_index(), 6);
        assert_eq!(grid.weeks_count(), 6);
        assert_eq!(grid.next_inout_count(), 5);
        assert_eq!(grid.day_at(5, 1).unwrap().date, DateItem::new(2017, 7, 31));
    }

    #[test]
    fn test_monday_anchor_wraps() {
        // October 2017 starts on Sunday: last column with a Monday anchor.
        let grid = grid(2017, 10, Weekday::Mon);
        assert_eq!(grid.first_day_index(), 6);
        assert_eq!(grid.day_at(0, 0).unwrap().date, DateItem::new(2017, 9, 25));
    }

    #[test]
    fn test_year_rollover_fringe() {
        let grid = grid(2024, 12, Weekday::Sun);
        let last_cell = grid.day_at(5, 6).unwrap();
        assert_eq!(last_cell.date.year, 2025);
        assert_eq!(last_cell.date.month, 1);

        let grid = super::build_month_grid(MonthKey::new(2024, 1), Weekday::Sun, None).unwrap();
        let first_cell = grid.day_at(0, 0).unwrap();
        assert_eq!(first_cell.date, DateItem::new(2023, 12, 31));
    }

    #[test]
    fn test_grid_properties_hold_for_every_anchor() {
        let mut month = MonthKey::new(2015, 1);
        for _ in 0..60 {
            for anchor in ANCHORS {
                let grid = build_month_grid(month, anchor, None).unwrap();
                let days = days_in_month(month);

                let current: Vec<u32> = grid.current_days().map(|day| day.date.day).collect();
                assert_eq!(current, (1..=days).collect::<Vec<_>>());
                assert!(grid.current_days().all(|day| month.contains(&day.date)));

                assert!(grid.first_day_index() < 7);
                let first = grid.day_at(0, grid.first_day_index()).unwrap();
                assert_eq!(first.date.day, 1);
                assert_eq!(first.kind, DayKind::Current);

                assert!((4..=6).contains(&grid.weeks_count()));
                assert_eq!(grid.weeks_count(), weeks_needed(grid.first_day_index(), days));
                assert!(grid.weeks()[grid.weeks_count() - 1]
                    .iter()
                    .flatten()
                    .any(|day| day.kind == DayKind::Current));

                assert_eq!(grid.days().count(), GRID_CELLS);
                for (row, week) in grid.weeks().iter().enumerate() {
                    for (column, cell) in week.iter().enumerate() {
                        let day = cell.unwrap();
                        assert_eq!(day.weekday_index, column);
                        assert_eq!(day.weekday, day.date.to_naive().unwrap().weekday());
                        assert_eq!(grid.position_of(&day.date), Some((row, column)));
                    }
                }
            }
            month = month.next();
        }
    }

    #[test]
    fn test_today_marks_current_and_fringe() {
        let today = DateItem::new(2017, 4, 1);
        let march =
            build_month_grid(MonthKey::new(2017, 3), Weekday::Sun, Some(today)).unwrap();
        let april =
            build_month_grid(MonthKey::new(2017, 4), Weekday::Sun, Some(today)).unwrap();

        let fringe = march.day(&today).unwrap();
        assert!(fringe.is_today);
        assert_eq!(fringe.kind, DayKind::InOut);
        assert_eq!(march.days().filter(|day| day.is_today).count(), 1);

        let own = april.day(&today).unwrap();
        assert!(own.is_today);
        assert_eq!(own.kind, DayKind::Current);
        assert_eq!(april.today(), Some(today));
    }

    #[test]
    fn test_selection_flags() {
        let mut grid = grid(2017, 3, Weekday::Sun);
        let date = DateItem::new(2017, 3, 17);
        assert!(grid.set_selected(&date, true));
        assert!(!grid.set_selected(&date, true));
        assert!(grid.day(&date).unwrap().is_selected);

        let fringe = DateItem::new(2017, 4, 2);
        assert!(grid.set_selected(&fringe, true));
        assert_eq!(grid.selected_days().count(), 2);

        assert!(!grid.set_selected(&DateItem::new(2017, 6, 1), true));
        assert!(!grid.set_selected(&DateItem::new(2017, 3, 32), true));

        assert_eq!(grid.clear_selection(), 2);
        assert_eq!(grid.selected_days().count(), 0);
    }

    #[test]
    fn test_weekend_flag() {
        let grid = grid(2017, 3, Weekday::Mon);
        let saturday = grid.day(&DateItem::new(2017, 3, 4)).unwrap();
        assert!(saturday.is_weekend());
        assert_eq!(saturday.weekday_index, 5);
        let monday = grid.day(&DateItem::new(2017, 3, 6)).unwrap();
        assert!(!monday.is_weekend());
        assert_eq!(monday.weekday_index, 0);
    }

    #[test]
    fn test_unsupported_month() {
        let result = build_month_grid(MonthKey::new(10_000, 1), Weekday::Sun, None);
        assert_eq!(
            result.unwrap_err(),
            InitError::UnsupportedMonth(MonthKey::new(10_000, 1))
        );
    }
}
