//! Property tests for month grids over a long range of months.

use chrono::Datelike;
use lattice_calendar_core::{
    build_month_grid, days_in_month, next_month, previous_month, weekday_order, DayKind, MonthKey,
    Weekday, DAYS_IN_WEEK, GRID_CELLS, MAX_WEEKS_IN_MONTH,
};

const ANCHORS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn months_between(first_year: i32, last_year: i32) -> impl Iterator<Item = MonthKey> {
    (first_year..=last_year).flat_map(|year| (1..=12).map(move |month| MonthKey::new(year, month)))
}

#[test]
fn test_current_days_cover_the_month() {
    for month in months_between(1970, 2100) {
        for anchor in ANCHORS {
            let grid = build_month_grid(month, anchor, None).unwrap();
            let days: Vec<u32> = grid.current_days().map(|day| day.date.day).collect();
            let expected: Vec<u32> = (1..=days_in_month(month)).collect();
            assert_eq!(days, expected, "{month} anchored on {anchor}");

            assert!(grid.first_day_index() < DAYS_IN_WEEK);
            let first = grid.day_at(0, grid.first_day_index()).unwrap();
            assert_eq!((first.date.day, first.kind), (1, DayKind::Current));

            assert!((4..=6).contains(&grid.weeks_count()));
            let cells = grid.first_day_index() + grid.day_count() as usize;
            assert_eq!(grid.weeks_count(), cells.div_ceil(DAYS_IN_WEEK));
            assert_eq!(grid.days().count(), GRID_CELLS);
            assert_eq!(
                grid.previous_inout_count() + grid.day_count() as usize + grid.next_inout_count(),
                GRID_CELLS
            );
        }
    }
}

#[test]
fn test_columns_match_calendar_weekdays() {
    for month in months_between(2015, 2030) {
        for anchor in ANCHORS {
            let grid = build_month_grid(month, anchor, None).unwrap();
            let header = weekday_order(anchor);
            for row in 0..MAX_WEEKS_IN_MONTH {
                for column in 0..DAYS_IN_WEEK {
                    let day = grid.day_at(row, column).unwrap();
                    let actual = day.date.to_naive().unwrap().weekday();
                    assert_eq!(day.weekday, actual);
                    assert_eq!(header[column], actual);
                    assert_eq!(day.weekday_index, column);
                }
            }
        }
    }
}

#[test]
fn test_in_out_days_belong_to_neighbours() {
    for month in months_between(1999, 2001) {
        let grid = build_month_grid(month, Weekday::Sun, None).unwrap();
        for day in grid.days().filter(|day| day.is_in_out()) {
            let owner = day.month_key();
            assert!(
                owner == previous_month(month) || owner == next_month(month),
                "{} in the {month} grid",
                day.date
            );
        }
    }
}

#[test]
fn test_month_round_trip_across_years() {
    for month in months_between(1, 9999).step_by(7) {
        assert_eq!(previous_month(next_month(month)), month);
        assert_eq!(next_month(previous_month(month)), month);
    }
}
