//! The month page cache.
//!
//! [`MonthPageCache`] owns a bounded, ordered window of month keys, the
//! grid of every resident month and the selection ledger. Pages are
//! addressed by their position in the window. Pagination (see the `pager`
//! module) slides the window forward or backward while conserving its size.
//!
//! All state lives behind one mutex; each mutation commits in a single
//! critical section, so readers never see a window key without its grid.
//! Signals are emitted after the lock is released, so slots may call back
//! into the cache.
//!
//! # Example
//!
//! ```
//! use lattice_calendar::{DateItem, MonthKey, MonthPageCache, Weekday};
//!
//! let cache = MonthPageCache::builder()
//!     .window_size(5)
//!     .first_weekday(Weekday::Sun)
//!     .initial_date(DateItem::new(2017, 3, 17))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cache.window().first(), Some(&MonthKey::new(2017, 1)));
//! assert_eq!(cache.visible_pages(1, 2, 0).unwrap(), vec![MonthKey::new(2017, 1)]);
//!
//! cache.load_next_blocking(1).unwrap();
//! assert_eq!(cache.window().last(), Some(&MonthKey::new(2017, 6)));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use lattice_calendar_core::logging::targets;
use lattice_calendar_core::{
    CalendarError, DateItem, Day, IndexError, InitError, MonthGrid, MonthKey, Signal, Weekday,
    Worker, WorkerConfig,
};

use crate::pager::{build_grids, WindowChange};
use crate::selection::{
    plan_tap, SelectionChange, SelectionLedger, SelectionMode, TapPlan, TapPolicy,
};
use crate::settings::CalendarSettings;

/// Source of today's date.
pub type Clock = Box<dyn Fn() -> DateItem + Send + Sync>;

/// Lifecycle of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    /// No window has been built yet.
    #[default]
    Uninitialized,
    /// The window has been built by a successful reset.
    Ready,
}

/// Configuration for creating a [`MonthPageCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of resident months. Values below 1 are treated as 1.
    pub window_size: usize,
    pub first_weekday: Weekday,
    pub selection_mode: SelectionMode,
    /// Configuration of the pagination worker thread.
    pub worker: WorkerConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from_settings(&CalendarSettings::default())
    }
}

impl CacheConfig {
    pub fn from_settings(settings: &CalendarSettings) -> Self {
        Self {
            window_size: settings.window_size(),
            first_weekday: settings.first_weekday,
            selection_mode: settings.selection_mode,
            worker: WorkerConfig::with_name("lattice-calendar-pager"),
        }
    }
}

/// Split of a window around its initial month: `(before, after)`.
///
/// The initial month takes one slot; an even remainder is shared evenly
/// and an odd one gives the extra month to the past.
pub fn window_split(window_size: usize) -> (usize, usize) {
    let window_size = window_size.max(1);
    (window_size / 2, (window_size - 1) / 2)
}

/// Month keys of a window of `window_size` months around `initial`.
pub fn window_months(initial: MonthKey, window_size: usize) -> Result<Vec<MonthKey>, InitError> {
    let (before, after) = window_split(window_size);
    let before = i64::try_from(before).map_err(|_| InitError::UnsupportedMonth(initial))?;
    let after = i64::try_from(after).map_err(|_| InitError::UnsupportedMonth(initial))?;
    (-before..=after)
        .map(|offset| {
            initial
                .offset(offset)
                .ok_or(InitError::UnsupportedMonth(initial))
        })
        .collect()
}

pub(crate) struct Inner {
    pub(crate) state: CacheState,
    pub(crate) window: VecDeque<MonthKey>,
    pub(crate) pages: HashMap<MonthKey, MonthGrid>,
    pub(crate) ledger: SelectionLedger,
    pub(crate) selection_mode: SelectionMode,
    pub(crate) initial_date: Option<DateItem>,
    pub(crate) today: DateItem,
    /// Bumped by every commit that replaces or moves grids.
    pub(crate) generation: u64,
}

impl Inner {
    /// Store a grid that has entered the window, mirroring the ledger onto it.
    pub(crate) fn insert_page(&mut self, mut grid: MonthGrid) {
        self.ledger.project_onto(&mut grid);
        self.pages.insert(grid.month(), grid);
    }

    /// Window keys between the `page_range` bounds, clamped to the window.
    fn visible_keys(&self, range: Option<(usize, usize)>) -> impl Iterator<Item = &MonthKey> {
        let (start, end) = range.unwrap_or((0, 0));
        let end = end.min(self.window.len());
        self.window.range(start.min(end)..end)
    }

    fn mark(&mut self, date: &DateItem, selected: bool) {
        for grid in self.pages.values_mut() {
            grid.set_selected(date, selected);
        }
    }

    fn select(&mut self, date: DateItem, first_weekday: Weekday) -> Option<Day> {
        if !date.is_valid() || self.ledger.contains(&date) {
            return None;
        }
        let day = match self
            .pages
            .get(&date.month_key())
            .and_then(|grid| grid.day(&date))
        {
            Some(day) => Day {
                is_selected: true,
                ..*day
            },
            None => SelectionLedger::day_for(date, first_weekday, Some(self.today))?,
        };
        self.ledger.push(day);
        self.mark(&date, true);
        Some(day)
    }

    fn deselect(&mut self, date: &DateItem) -> Option<Day> {
        let day = self.ledger.remove(date)?;
        self.mark(date, false);
        Some(day)
    }

    fn deselect_last(&mut self) -> Option<Day> {
        let day = self.ledger.pop()?;
        self.mark(&day.date, false);
        Some(day)
    }
}

pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    pub(crate) first_weekday: Weekday,
    pub(crate) window_size: usize,
    pub(crate) clock: Clock,
    pub(crate) tap_policy: TapPolicy,
    pub(crate) selection_changed: Signal<SelectionChange>,
    pub(crate) window_changed: Signal<WindowChange>,
}

/// A sliding window of month grids plus the selection ledger.
pub struct MonthPageCache {
    shared: Arc<Shared>,
    worker: Worker,
}

impl MonthPageCache {
    /// Create an uninitialized cache. Call [`reset`](Self::reset) to build the window.
    ///
    /// # Errors
    ///
    /// Fails if the pagination worker thread cannot be spawned.
    pub fn new(config: CacheConfig) -> Result<Self, CalendarError> {
        Self::with_clock(config, Box::new(DateItem::today))
    }

    /// Create an uninitialized cache that reads today's date from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Clock) -> Result<Self, CalendarError> {
        Self::create(config, clock, TapPolicy::default())
    }

    fn create(
        config: CacheConfig,
        clock: Clock,
        tap_policy: TapPolicy,
    ) -> Result<Self, CalendarError> {
        let worker = Worker::new(config.worker)?;
        let today = clock();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: CacheState::Uninitialized,
                window: VecDeque::new(),
                pages: HashMap::new(),
                ledger: SelectionLedger::new(),
                selection_mode: config.selection_mode,
                initial_date: None,
                today,
                generation: 0,
            }),
            first_weekday: config.first_weekday,
            window_size: config.window_size.max(1),
            clock,
            tap_policy,
            selection_changed: Signal::new(),
            window_changed: Signal::new(),
        });

        Ok(Self { shared, worker })
    }

    pub fn builder() -> MonthPageCacheBuilder {
        MonthPageCacheBuilder::new()
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    pub(crate) fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Rebuild the window around `initial_date`, or today's month if `None`.
    ///
    /// Today's marker is re-read from the clock. Ledger selections are
    /// re-applied to every rebuilt grid that shows them.
    ///
    /// # Errors
    ///
    /// [`InitError::InvalidDate`] if `initial_date` fails the validity
    /// predicate, or [`InitError::UnsupportedMonth`] if the window would
    /// leave the supported calendar range. The cache is unchanged on error.
    pub fn reset(&self, initial_date: Option<DateItem>) -> Result<(), InitError> {
        if let Some(date) = initial_date {
            if !date.is_valid() {
                tracing::warn!(target: targets::CACHE, %date, "rejected invalid initial date");
                return Err(InitError::InvalidDate(date));
            }
        }

        let today = (self.shared.clock)();
        let initial = initial_date.unwrap_or(today);
        let initial_month = initial.month_key();
        let keys = window_months(initial_month, self.shared.window_size)?;
        let grids = build_grids(&keys, self.shared.first_weekday, Some(today))?;

        {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            inner.window = keys.into_iter().collect();
            inner.pages.clear();
            inner.ledger.mark_today(today);
            for grid in grids {
                inner.insert_page(grid);
            }
            inner.today = today;
            inner.initial_date = Some(initial);
            inner.state = CacheState::Ready;
        }

        tracing::debug!(
            target: targets::CACHE,
            initial = %initial,
            window_size = self.shared.window_size,
            "month window reset"
        );
        self.shared
            .window_changed
            .emit(WindowChange::Reset { initial_month });
        Ok(())
    }

    /// Re-read today's date from the clock. See [`set_today`](Self::set_today).
    pub fn refresh_today(&self) -> bool {
        let today = (self.shared.clock)();
        self.set_today(today)
    }

    /// Move today's marker to `today`, rebuilding every resident grid.
    ///
    /// Returns `false` if the marker was already on `today`.
    pub fn set_today(&self, today: DateItem) -> bool {
        loop {
            let (generation, keys) = {
                let inner = self.shared.inner.lock();
                if inner.today == today {
                    return false;
                }
                (inner.generation, inner.window.iter().copied().collect::<Vec<_>>())
            };

            let grids = match build_grids(&keys, self.shared.first_weekday, Some(today)) {
                Ok(grids) => grids,
                Err(err) => {
                    tracing::error!(target: targets::CACHE, error = %err, "failed to rebuild resident grids");
                    return false;
                }
            };

            let mut inner = self.shared.inner.lock();
            if inner.generation != generation {
                continue;
            }
            inner.generation += 1;
            inner.today = today;
            inner.ledger.mark_today(today);
            inner.pages.clear();
            for grid in grids {
                inner.insert_page(grid);
            }
            break;
        }

        tracing::debug!(target: targets::CACHE, %today, "today marker moved");
        self.shared
            .window_changed
            .emit(WindowChange::TodayChanged { today });
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> CacheState {
        self.shared.inner.lock().state
    }

    pub fn first_weekday(&self) -> Weekday {
        self.shared.first_weekday
    }

    /// Number of resident months once the window is built.
    pub fn window_size(&self) -> usize {
        self.shared.window_size
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.shared.inner.lock().selection_mode
    }

    pub fn set_selection_mode(&self, mode: SelectionMode) {
        self.shared.inner.lock().selection_mode = mode;
    }

    /// The date of the last successful reset.
    pub fn initial_date(&self) -> Option<DateItem> {
        self.shared.inner.lock().initial_date
    }

    pub fn today(&self) -> DateItem {
        self.shared.inner.lock().today
    }

    /// Resident month keys, earliest first.
    pub fn window(&self) -> Vec<MonthKey> {
        self.shared.inner.lock().window.iter().copied().collect()
    }

    pub fn page_count(&self) -> usize {
        self.shared.inner.lock().window.len()
    }

    /// Position of `month` in the window.
    pub fn index_of(&self, month: MonthKey) -> Option<usize> {
        self.shared
            .inner
            .lock()
            .window
            .iter()
            .position(|&key| key == month)
    }

    /// The grid at `index` in the window, or `None` if out of bounds.
    pub fn page_at(&self, index: usize) -> Option<MonthGrid> {
        let inner = self.shared.inner.lock();
        let key = inner.window.get(index)?;
        inner.pages.get(key).cloned()
    }

    /// The grid of a resident month.
    pub fn month(&self, month: MonthKey) -> Option<MonthGrid> {
        self.shared.inner.lock().pages.get(&month).cloned()
    }

    /// Month keys on page `page` of the window.
    ///
    /// The window is split into pages of `page_size` months; `overscan`
    /// months are preloaded on each side of the visible page, so
    /// `(page_size + 2 * overscan) / page_size` pages are addressable.
    /// A page index outside that range yields an empty list.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidPageSize`] if `page_size <= 0`, or
    /// [`IndexError::NegativeOverscan`] if `overscan < 0`.
    pub fn visible_pages(
        &self,
        page_size: i64,
        overscan: i64,
        page: i64,
    ) -> Result<Vec<MonthKey>, IndexError> {
        let range = page_range(page_size, overscan, page)?;
        let inner = self.shared.inner.lock();
        Ok(inner.visible_keys(range).copied().collect())
    }

    /// Tallest `weeks_count` among the grids on page `page`.
    ///
    /// # Errors
    ///
    /// The argument errors of [`visible_pages`](Self::visible_pages), or
    /// [`IndexError::NoVisiblePages`] if the page holds no resident month.
    pub fn row_count_for(&self, page_size: i64, overscan: i64, page: i64) -> Result<usize, IndexError> {
        let range = page_range(page_size, overscan, page)?;
        let inner = self.shared.inner.lock();
        inner
            .visible_keys(range)
            .filter_map(|key| inner.pages.get(key))
            .map(MonthGrid::weeks_count)
            .max()
            .ok_or(IndexError::NoVisiblePages { page })
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Selected days, oldest first.
    pub fn selected_days(&self) -> Vec<Day> {
        self.shared.inner.lock().ledger.as_slice().to_vec()
    }

    /// The most recent selection.
    pub fn last_selected_day(&self) -> Option<Day> {
        self.shared.inner.lock().ledger.last().copied()
    }

    pub fn is_selected(&self, date: &DateItem) -> bool {
        self.shared.inner.lock().ledger.contains(date)
    }

    /// Select the date of `day`. An in/out day selects the date in its own month.
    ///
    /// Returns `false` if the date was already selected or is not a valid date.
    pub fn select(&self, day: &Day) -> bool {
        self.select_date(day.date)
    }

    /// Select `date`, whether or not its month is resident.
    pub fn select_date(&self, date: DateItem) -> bool {
        let selected = self.shared.inner.lock().select(date, self.shared.first_weekday);
        match selected {
            Some(day) => {
                self.notify_selection(SelectionChange::selected(day));
                true
            }
            None => false,
        }
    }

    /// Remove the first ledger entry with the date of `day`.
    pub fn deselect(&self, day: &Day) -> bool {
        self.deselect_date(&day.date)
    }

    pub fn deselect_date(&self, date: &DateItem) -> bool {
        let deselected = self.shared.inner.lock().deselect(date);
        match deselected {
            Some(day) => {
                self.notify_selection(SelectionChange::deselected(day));
                true
            }
            None => false,
        }
    }

    /// Deselect the most recent selection. Does nothing if none is selected.
    pub fn deselect_last(&self) -> Option<Day> {
        let deselected = self.shared.inner.lock().deselect_last();
        if let Some(day) = deselected {
            self.notify_selection(SelectionChange::deselected(day));
        }
        deselected
    }

    /// Deselect everything.
    pub fn clear_selection(&self) -> Vec<Day> {
        let deselected = {
            let mut inner = self.shared.inner.lock();
            let days = inner.ledger.drain();
            for grid in inner.pages.values_mut() {
                grid.clear_selection();
            }
            days
        };
        if !deselected.is_empty() {
            self.notify_selection(SelectionChange {
                selected: None,
                deselected: deselected.clone(),
            });
        }
        deselected
    }

    /// Apply a tap on `day` under the current selection mode.
    ///
    /// In/out days are ignored. A selected day is toggled off. Otherwise the
    /// day is selected, replacing the most recent selection in single mode.
    /// The builder's `should_select`/`should_deselect` predicates may veto
    /// either step; they run without the cache lock held.
    pub fn tap(&self, day: &Day) -> SelectionChange {
        let change = loop {
            let plan = {
                let inner = self.shared.inner.lock();
                plan_tap(inner.selection_mode, &inner.ledger, day)
            };
            let resolved = self.shared.tap_policy.resolve(plan);

            let mut inner = self.shared.inner.lock();
            if plan_tap(inner.selection_mode, &inner.ledger, day) != plan {
                // The selection moved while the predicates ran.
                continue;
            }
            break match resolved {
                TapPlan::Ignore => SelectionChange::default(),
                TapPlan::Deselect(selected) => inner
                    .deselect(&selected.date)
                    .map(SelectionChange::deselected)
                    .unwrap_or_default(),
                TapPlan::Select { day, replace } => {
                    let mut change = SelectionChange::default();
                    if replace.is_some() {
                        change.deselected.extend(inner.deselect_last());
                    }
                    change.selected = inner.select(day.date, self.shared.first_weekday);
                    change
                }
            };
        };

        if !change.is_empty() {
            self.notify_selection(change.clone());
        }
        change
    }

    fn notify_selection(&self, change: SelectionChange) {
        tracing::debug!(
            target: targets::SELECTION,
            selected = ?change.selected.map(|day| day.date),
            deselected = change.deselected.len(),
            "selection changed"
        );
        self.shared.selection_changed.emit(change);
    }

    // ========================================================================
    // Signals
    // ========================================================================

    /// Emitted after every committed selection change.
    pub fn selection_changed(&self) -> &Signal<SelectionChange> {
        &self.shared.selection_changed
    }

    /// Emitted after every reset, pagination commit and today change.
    ///
    /// Pagination emits on the worker thread.
    pub fn window_changed(&self) -> &Signal<WindowChange> {
        &self.shared.window_changed
    }

    /// Stop the pagination worker and wait for queued jobs to finish.
    pub fn shutdown(&self) {
        self.worker.stop_and_join();
    }
}

impl std::fmt::Debug for MonthPageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("MonthPageCache")
            .field("state", &inner.state)
            .field("window", &inner.window)
            .field("selected", &inner.ledger.len())
            .field("today", &inner.today)
            .field("worker", &self.worker)
            .finish()
    }
}

static_assertions::assert_impl_all!(MonthPageCache: Send, Sync);

/// Start and end window positions of `page`, or `None` if it is out of range.
fn page_range(
    page_size: i64,
    overscan: i64,
    page: i64,
) -> Result<Option<(usize, usize)>, IndexError> {
    if page_size <= 0 {
        return Err(IndexError::InvalidPageSize(page_size));
    }
    if overscan < 0 {
        return Err(IndexError::NegativeOverscan(overscan));
    }

    let page_count = overscan
        .saturating_mul(2)
        .saturating_add(page_size)
        / page_size;
    if page < 0 || page >= page_count {
        return Ok(None);
    }

    let start = page.saturating_mul(page_size);
    let end = start.saturating_add(page_size);
    Ok(Some((
        usize::try_from(start).unwrap_or(usize::MAX),
        usize::try_from(end).unwrap_or(usize::MAX),
    )))
}

/// Builder for [`MonthPageCache`].
pub struct MonthPageCacheBuilder {
    config: CacheConfig,
    initial_date: Option<DateItem>,
    selected: Vec<DateItem>,
    clock: Option<Clock>,
    tap_policy: TapPolicy,
}

impl Default for MonthPageCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthPageCacheBuilder {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            initial_date: None,
            selected: Vec::new(),
            clock: None,
            tap_policy: TapPolicy::default(),
        }
    }

    /// Take window size, first weekday, selection mode and initial date from `settings`.
    pub fn settings(mut self, settings: &CalendarSettings) -> Self {
        let worker = self.config.worker;
        self.config = CacheConfig {
            worker,
            ..CacheConfig::from_settings(settings)
        };
        self.initial_date = settings.initial_date;
        self
    }

    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    pub fn first_weekday(mut self, first_weekday: Weekday) -> Self {
        self.config.first_weekday = first_weekday;
        self
    }

    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.config.selection_mode = mode;
        self
    }

    /// Name of the pagination worker thread.
    pub fn worker_name(mut self, name: impl Into<String>) -> Self {
        self.config.worker.name = name.into();
        self
    }

    pub fn initial_date(mut self, date: DateItem) -> Self {
        self.initial_date = Some(date);
        self
    }

    /// Pre-selected dates, in selection order. They may span any months.
    pub fn selected_days(mut self, dates: impl IntoIterator<Item = DateItem>) -> Self {
        self.selected.extend(dates);
        self
    }

    /// Read today's date from `clock` instead of the local clock.
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateItem + Send + Sync + 'static,
    {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Let `predicate` veto taps that would select a day.
    pub fn should_select<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Day) -> bool + Send + Sync + 'static,
    {
        self.tap_policy = self.tap_policy.with_should_select(predicate);
        self
    }

    /// Let `predicate` veto taps that would deselect a day.
    ///
    /// In single mode a vetoed replacement also blocks the new selection.
    pub fn should_deselect<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Day) -> bool + Send + Sync + 'static,
    {
        self.tap_policy = self.tap_policy.with_should_deselect(predicate);
        self
    }

    /// Create the cache, seed its selections and build the first window.
    ///
    /// # Errors
    ///
    /// [`CalendarError::Init`] if the initial date or a seeded selection is
    /// invalid, or the worker spawn error.
    pub fn build(self) -> Result<MonthPageCache, CalendarError> {
        if let Some(date) = self.selected.iter().find(|date| !date.is_valid()) {
            return Err(InitError::InvalidDate(*date).into());
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(DateItem::today) as Clock);
        let cache = MonthPageCache::create(self.config, clock, self.tap_policy)?;
        {
            let mut inner = cache.shared.inner.lock();
            let today = inner.today;
            for date in self.selected {
                let day = SelectionLedger::day_for(date, cache.shared.first_weekday, Some(today))
                    .ok_or(InitError::InvalidDate(date))?;
                inner.ledger.push(day);
            }
        }
        cache.reset(self.initial_date)?;
        Ok(cache)
    }
}

impl std::fmt::Debug for MonthPageCacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonthPageCacheBuilder")
            .field("config", &self.config)
            .field("initial_date", &self.initial_date)
            .field("selected", &self.selected)
            .field("tap_policy", &self.tap_policy)
            .finish()
    }
}
