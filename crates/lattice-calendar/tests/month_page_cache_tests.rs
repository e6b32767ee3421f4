//! Tests for the month page cache: windowing, pagination and selection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lattice_calendar::{
    CalendarError, CacheState, DateItem, DayKind, IndexError, InitError, MonthKey, MonthPageCache,
    PageDirection, SelectionMode, Weekday, WindowChange,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn cache_at(window_size: usize, initial: DateItem) -> MonthPageCache {
    init_tracing();
    MonthPageCache::builder()
        .window_size(window_size)
        .first_weekday(Weekday::Sun)
        .clock(|| DateItem::new(2017, 3, 10))
        .initial_date(initial)
        .build()
        .unwrap()
}

fn months(keys: &[(i32, u32)]) -> Vec<MonthKey> {
    keys.iter().map(|&(year, month)| MonthKey::new(year, month)).collect()
}

/// Every window key has a grid and the keys are consecutive months.
fn assert_consistent(cache: &MonthPageCache) {
    let window = cache.window();
    for pair in window.windows(2) {
        assert_eq!(pair[0].next(), pair[1], "window is not contiguous: {window:?}");
    }
    for (index, key) in window.iter().enumerate() {
        let grid = cache.page_at(index).expect("window key without grid");
        assert_eq!(grid.month(), *key);
    }
}

#[test]
fn test_initial_window_around_march_2017() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    assert_eq!(cache.state(), CacheState::Ready);
    assert_eq!(
        cache.window(),
        months(&[(2017, 1), (2017, 2), (2017, 3), (2017, 4), (2017, 5)])
    );
    assert_consistent(&cache);
}

#[test]
fn test_load_next_conserves_window() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));

    let outcome = cache.load_next_blocking(1).unwrap();
    assert_eq!(outcome.direction, PageDirection::Next);
    assert_eq!(outcome.inserted, months(&[(2017, 6)]));
    assert_eq!(outcome.evicted, months(&[(2017, 1)]));

    assert_eq!(
        cache.window(),
        months(&[(2017, 2), (2017, 3), (2017, 4), (2017, 5), (2017, 6)])
    );
    assert!(cache.month(MonthKey::new(2017, 1)).is_none());
    assert_consistent(&cache);
}

#[test]
fn test_load_previous_conserves_window() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));

    let outcome = cache.load_previous_blocking(2).unwrap();
    assert_eq!(outcome.inserted, months(&[(2016, 11), (2016, 12)]));
    assert_eq!(outcome.evicted, months(&[(2017, 5), (2017, 4)]));
    assert_eq!(
        cache.window(),
        months(&[(2016, 11), (2016, 12), (2017, 1), (2017, 2), (2017, 3)])
    );
    assert_consistent(&cache);
}

#[test]
fn test_load_more_than_window() {
    let cache = cache_at(3, DateItem::new(2017, 3, 1));
    let outcome = cache.load_next_blocking(12).unwrap();
    assert_eq!(outcome.requested, 12);
    assert_eq!(outcome.evicted, months(&[(2017, 2), (2017, 3), (2017, 4)]));
    // Only the last three of the twelve entering months survive.
    assert_eq!(outcome.inserted, months(&[(2018, 2), (2018, 3), (2018, 4)]));
    assert_eq!(cache.window(), months(&[(2018, 2), (2018, 3), (2018, 4)]));
    assert_consistent(&cache);
}

#[test]
fn test_zero_count_completes_immediately() {
    let cache = cache_at(3, DateItem::new(2017, 3, 1));
    let request = cache.load_next(0).unwrap();
    assert!(request.is_finished());
    let outcome = request.wait().unwrap();
    assert!(outcome.is_unchanged());
}

#[test]
fn test_empty_window_completes_without_change() {
    init_tracing();
    let cache = MonthPageCache::new(Default::default()).unwrap();
    assert_eq!(cache.state(), CacheState::Uninitialized);
    let outcome = cache.load_previous_blocking(4).unwrap();
    assert!(outcome.is_unchanged());
    assert_eq!(cache.page_count(), 0);
}

#[test]
fn test_paginations_commit_in_submission_order() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut requests = Vec::new();
    for (step, direction) in [
        PageDirection::Next,
        PageDirection::Next,
        PageDirection::Next,
        PageDirection::Previous,
    ]
    .into_iter()
    .enumerate()
    {
        let order = order.clone();
        let on_complete = move |result: &lattice_calendar::PageResult| {
            assert!(result.is_ok());
            order.lock().unwrap().push(step);
        };
        let request = match direction {
            PageDirection::Next => cache.load_next_with(1, on_complete),
            PageDirection::Previous => cache.load_previous_with(1, on_complete),
        };
        requests.push(request.unwrap());
    }

    let outcomes: Vec<_> = requests
        .into_iter()
        .map(|request| request.wait().unwrap())
        .collect();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(outcomes[2].inserted, months(&[(2017, 8)]));
    assert_eq!(outcomes[3].inserted, months(&[(2017, 3)]));
    assert_eq!(
        cache.window(),
        months(&[(2017, 3), (2017, 4), (2017, 5), (2017, 6), (2017, 7)])
    );
    assert_consistent(&cache);
}

#[test]
fn test_request_wait_timeout() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    let request = cache.load_next(1).unwrap();
    let result = request
        .wait_timeout(Duration::from_secs(10))
        .expect("pagination did not finish");
    assert!(result.is_ok());
    assert!(request.try_get().is_none());
    // Taking the result does not make the job unfinished.
    assert!(request.is_finished());
}

#[test]
fn test_try_get_keeps_request_finished() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    let request = cache.load_previous(1).unwrap();
    assert_eq!(request.direction(), PageDirection::Previous);

    let result = loop {
        if let Some(result) = request.try_get() {
            break result;
        }
        std::thread::sleep(Duration::from_millis(1));
    };
    assert_eq!(result.unwrap().inserted, months(&[(2016, 12)]));
    assert!(request.is_finished());
    assert!(request.try_get().is_none());
}

#[test]
fn test_window_changed_signal() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = changes.clone();
    cache.window_changed().connect(move |change| {
        changes_clone.lock().unwrap().push(change.clone());
    });

    cache.load_next_blocking(1).unwrap();
    cache.reset(Some(DateItem::new(2020, 1, 1))).unwrap();

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 2);
    match &changes[0] {
        WindowChange::Paged(outcome) => assert_eq!(outcome.inserted, months(&[(2017, 6)])),
        other => panic!("unexpected change {other:?}"),
    }
    assert_eq!(
        changes[1],
        WindowChange::Reset {
            initial_month: MonthKey::new(2020, 1)
        }
    );
}

#[test]
fn test_slot_may_query_cache_during_pagination() {
    let cache = Arc::new(cache_at(5, DateItem::new(2017, 3, 17)));
    let seen = Arc::new(AtomicUsize::new(0));

    let weak = Arc::downgrade(&cache);
    let seen_clone = seen.clone();
    cache.window_changed().connect(move |_| {
        if let Some(cache) = weak.upgrade() {
            seen_clone.store(cache.page_count(), Ordering::SeqCst);
        }
    });

    cache.load_next_blocking(2).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[test]
fn test_pagination_past_supported_range() {
    let cache = cache_at(3, DateItem::new(9999, 11, 1));
    let before = cache.window();

    let err = cache.load_next_blocking(1).unwrap_err();
    assert!(matches!(
        err,
        CalendarError::Init(InitError::UnsupportedMonth(month)) if month == MonthKey::new(10_000, 1)
    ));
    assert_eq!(cache.window(), before);
}

#[test]
fn test_reset_racing_pagination_keeps_window_consistent() {
    let cache = cache_at(7, DateItem::new(2017, 3, 17));
    let requests: Vec<_> = (0..4).map(|_| cache.load_next(3).unwrap()).collect();
    cache.reset(Some(DateItem::new(2030, 6, 1))).unwrap();

    for request in requests {
        request.wait().unwrap();
    }
    assert_eq!(cache.page_count(), 7);
    assert_consistent(&cache);
}

#[test]
fn test_visible_pages_bounds() {
    let cache = cache_at(7, DateItem::new(2017, 3, 17));

    assert!(cache.visible_pages(3, 2, -1).unwrap().is_empty());
    assert!(cache.visible_pages(3, 2, 3).unwrap().is_empty());
    assert!(cache.visible_pages(3, 2, 2).unwrap().is_empty());
    assert_eq!(
        cache.visible_pages(3, 2, 0).unwrap(),
        months(&[(2016, 12), (2017, 1), (2017, 2)])
    );
    assert_eq!(
        cache.visible_pages(3, 2, 1).unwrap(),
        months(&[(2017, 3), (2017, 4), (2017, 5)])
    );

    assert_eq!(cache.visible_pages(0, 2, 0), Err(IndexError::InvalidPageSize(0)));
    assert_eq!(cache.visible_pages(-3, 2, 0), Err(IndexError::InvalidPageSize(-3)));
    assert_eq!(cache.visible_pages(3, -1, 0), Err(IndexError::NegativeOverscan(-1)));
}

#[test]
fn test_row_count_stays_valid_during_pagination() {
    let cache = Arc::new(cache_at(5, DateItem::new(2017, 3, 17)));
    let done = Arc::new(AtomicBool::new(false));

    let pager = {
        let cache = cache.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                // Each page replaces the whole window.
                cache.load_next_blocking(5).unwrap();
                cache.load_previous_blocking(5).unwrap();
            }
        })
    };

    // Page 0 always holds the first resident month.
    let mut failures = 0;
    for _ in 0..50_000 {
        if cache.row_count_for(1, 2, 0).is_err() {
            failures += 1;
        }
        assert_eq!(cache.visible_pages(1, 2, 0).unwrap().len(), 1);
    }
    done.store(true, Ordering::SeqCst);
    pager.join().unwrap();

    assert_eq!(failures, 0);
    assert_consistent(&cache);
}

#[test]
fn test_visible_page_in_the_middle() {
    // One visible month with two months of overscan on each side.
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    assert_eq!(cache.visible_pages(1, 2, 2).unwrap(), months(&[(2017, 3)]));
    assert_eq!(cache.row_count_for(1, 2, 2), Ok(5));
}

#[test]
fn test_select_across_months_and_deselect_last() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    cache.set_selection_mode(SelectionMode::Multiple);

    assert!(cache.select_date(DateItem::new(2017, 3, 17)));
    assert!(cache.select_date(DateItem::new(2017, 4, 2)));

    let dates: Vec<_> = cache.selected_days().iter().map(|day| day.date).collect();
    assert_eq!(dates, vec![DateItem::new(2017, 3, 17), DateItem::new(2017, 4, 2)]);

    let removed = cache.deselect_last().unwrap();
    assert_eq!(removed.date, DateItem::new(2017, 4, 2));
    assert_eq!(
        cache.last_selected_day().map(|day| day.date),
        Some(DateItem::new(2017, 3, 17))
    );
    let april = cache.month(MonthKey::new(2017, 4)).unwrap();
    assert!(!april.day(&DateItem::new(2017, 4, 2)).unwrap().is_selected);
}

#[test]
fn test_deselect_last_on_empty_ledger() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    assert!(cache.deselect_last().is_none());
    assert!(cache.selected_days().is_empty());
}

#[test]
fn test_fringe_selection_shows_in_both_grids() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    // February 26th 2017 leads the March grid.
    let date = DateItem::new(2017, 2, 26);
    let march = cache.month(MonthKey::new(2017, 3)).unwrap();
    let fringe = *march.day(&date).unwrap();
    assert_eq!(fringe.kind, DayKind::InOut);

    assert!(cache.select(&fringe));
    for month in [MonthKey::new(2017, 2), MonthKey::new(2017, 3)] {
        let grid = cache.month(month).unwrap();
        assert!(grid.day(&date).unwrap().is_selected, "{month} not marked");
    }
}

#[test]
fn test_ledger_survives_eviction() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    let date = DateItem::new(2017, 1, 15);
    assert!(cache.select_date(date));

    cache.load_next_blocking(2).unwrap();
    assert!(cache.month(MonthKey::new(2017, 1)).is_none());
    assert!(cache.is_selected(&date));

    cache.load_previous_blocking(2).unwrap();
    let january = cache.month(MonthKey::new(2017, 1)).unwrap();
    assert!(january.day(&date).unwrap().is_selected);
}

#[test]
fn test_seeded_selection_outside_window() {
    init_tracing();
    let seeded = DateItem::new(2016, 6, 1);
    let cache = MonthPageCache::builder()
        .window_size(5)
        .initial_date(DateItem::new(2017, 3, 17))
        .selected_days([seeded, DateItem::new(2017, 3, 20)])
        .clock(|| DateItem::new(2017, 3, 10))
        .build()
        .unwrap();

    assert_eq!(cache.selected_days().len(), 2);
    assert_eq!(cache.last_selected_day().unwrap().date, DateItem::new(2017, 3, 20));
    assert!(cache
        .month(MonthKey::new(2017, 3))
        .unwrap()
        .day(&DateItem::new(2017, 3, 20))
        .unwrap()
        .is_selected);

    cache.reset(Some(DateItem::new(2016, 6, 15))).unwrap();
    let june = cache.month(MonthKey::new(2016, 6)).unwrap();
    assert!(june.day(&seeded).unwrap().is_selected);
    // The May grid shows June 1st as a trailing day.
    let may = cache.month(MonthKey::new(2016, 5)).unwrap();
    assert!(may.day(&seeded).unwrap().is_selected);
}

#[test]
fn test_select_non_resident_month() {
    let cache = cache_at(3, DateItem::new(2017, 3, 17));
    let date = DateItem::new(2019, 8, 8);
    assert!(cache.select_date(date));
    assert!(cache.is_selected(&date));
    assert_eq!(cache.last_selected_day().unwrap().weekday, Weekday::Thu);
}

#[test]
fn test_failed_reset_is_all_or_nothing() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    cache.select_date(DateItem::new(2017, 3, 1));
    let window = cache.window();

    for date in [
        DateItem::new(1969, 12, 31),
        DateItem::new(2017, 0, 1),
        DateItem::new(2017, 3, 32),
    ] {
        assert_eq!(cache.reset(Some(date)), Err(InitError::InvalidDate(date)));
    }
    assert_eq!(cache.window(), window);
    assert_eq!(cache.selected_days().len(), 1);
    assert_eq!(cache.state(), CacheState::Ready);
}

#[test]
fn test_tap_policy_through_cache() {
    let cache = cache_at(5, DateItem::new(2017, 3, 17));
    let changes = Arc::new(AtomicUsize::new(0));
    let changes_clone = changes.clone();
    cache.selection_changed().connect(move |_| {
        changes_clone.fetch_add(1, Ordering::SeqCst);
    });

    let march = cache.month(MonthKey::new(2017, 3)).unwrap();
    let first = *march.day(&DateItem::new(2017, 3, 17)).unwrap();
    let second = *march.day(&DateItem::new(2017, 3, 18)).unwrap();
    let fringe = *march.day(&DateItem::new(2017, 4, 1)).unwrap();

    cache.tap(&first);
    cache.tap(&second);
    assert!(cache.tap(&fringe).is_empty());
    assert_eq!(cache.selected_days().len(), 1);
    assert_eq!(changes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_refresh_today_reads_clock() {
    init_tracing();
    let today = Arc::new(Mutex::new(DateItem::new(2017, 3, 10)));
    let clock_today = today.clone();
    let cache = MonthPageCache::builder()
        .window_size(3)
        .initial_date(DateItem::new(2017, 3, 1))
        .clock(move || *clock_today.lock().unwrap())
        .build()
        .unwrap();

    assert!(!cache.refresh_today());

    *today.lock().unwrap() = DateItem::new(2017, 4, 1);
    assert!(cache.refresh_today());
    assert_eq!(cache.today(), DateItem::new(2017, 4, 1));

    // Both the trailing March cell and the April cell carry the marker.
    for month in [MonthKey::new(2017, 3), MonthKey::new(2017, 4)] {
        let grid = cache.month(month).unwrap();
        assert!(grid.day(&DateItem::new(2017, 4, 1)).unwrap().is_today);
        assert_eq!(grid.today(), Some(DateItem::new(2017, 4, 1)));
    }
}

#[test]
fn test_shutdown_rejects_pagination() {
    let cache = cache_at(3, DateItem::new(2017, 3, 1));
    cache.shutdown();
    assert!(matches!(cache.load_next(1), Err(CalendarError::WorkerStopped)));
}
