//! Background pagination of the month window.
//!
//! `load_next` and `load_previous` queue a job on the cache's worker thread
//! and return a [`PageRequest`]. Jobs run one at a time in submission order.
//! Each job:
//!
//! 1. snapshots the window edge and today's date under the cache lock,
//! 2. builds the entering grids in parallel on the rayon pool, unlocked,
//! 3. commits in one critical section: new keys and grids go in at the
//!    requested end, the selection ledger is projected onto them, and as
//!    many months are evicted from the opposite end.
//!
//! If the window was reset or otherwise rebuilt between steps 1 and 3, the
//! job starts over from a fresh snapshot. Completion is reported only after
//! the commit: first the optional callback, then the cache's
//! `window_changed` signal, then the [`PageRequest`] result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use rayon::prelude::*;

use lattice_calendar_core::logging::targets;
use lattice_calendar_core::{
    build_month_grid, CalendarError, DateItem, InitError, MonthGrid, MonthKey, PerfSpan, Weekday,
};

use crate::cache::{MonthPageCache, Shared};

/// Result delivered when a pagination job completes.
pub type PageResult = Result<PageOutcome, CalendarError>;

type Completion = Box<dyn FnOnce(&PageResult) + Send>;

/// Which end of the window a pagination extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageDirection {
    /// Append later months, evicting from the front.
    Next,
    /// Prepend earlier months, evicting from the back.
    Previous,
}

/// The committed effect of one pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub direction: PageDirection,
    /// The month count that was asked for.
    pub requested: usize,
    /// Months that entered the window, earliest first.
    pub inserted: Vec<MonthKey>,
    /// Months that left the window, in eviction order.
    pub evicted: Vec<MonthKey>,
}

impl PageOutcome {
    fn unchanged(direction: PageDirection, requested: usize) -> Self {
        Self {
            direction,
            requested,
            inserted: Vec::new(),
            evicted: Vec::new(),
        }
    }

    /// Whether the window was left as it was (empty window or zero count).
    pub fn is_unchanged(&self) -> bool {
        self.inserted.is_empty() && self.evicted.is_empty()
    }
}

/// A change to the resident month window, emitted by `window_changed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowChange {
    /// The window was rebuilt around a new initial month.
    Reset { initial_month: MonthKey },
    /// A pagination committed.
    Paged(PageOutcome),
    /// The resident grids were rebuilt for a new today marker.
    TodayChanged { today: DateItem },
}

/// Handle to a queued pagination.
///
/// Dropping the handle does not cancel the job.
#[derive(Debug)]
pub struct PageRequest {
    direction: PageDirection,
    count: usize,
    receiver: Receiver<PageResult>,
    taken: AtomicBool,
}

impl PageRequest {
    pub fn direction(&self) -> PageDirection {
        self.direction
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Check if the job has completed, whether or not its result was taken.
    pub fn is_finished(&self) -> bool {
        self.taken.load(Ordering::Acquire) || !self.receiver.is_empty()
    }

    fn take(&self, result: PageResult) -> PageResult {
        self.taken.store(true, Ordering::Release);
        result
    }

    /// Take the result without blocking, if the job has completed.
    ///
    /// Returns `None` once the result has been taken.
    pub fn try_get(&self) -> Option<PageResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(self.take(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the job completes.
    pub fn wait(self) -> PageResult {
        self.receiver
            .recv()
            .unwrap_or(Err(CalendarError::WorkerStopped))
    }

    /// Block until the job completes or `timeout` elapses.
    ///
    /// Returns `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PageResult> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(self.take(result)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(CalendarError::WorkerStopped)),
        }
    }
}

impl MonthPageCache {
    /// Queue `count` months to be appended after the last resident month.
    ///
    /// The same number of months is evicted from the front, so the window
    /// size is conserved. An empty window or a zero count completes
    /// without changes.
    ///
    /// # Errors
    ///
    /// Fails if the worker is stopped or its queue is full.
    pub fn load_next(&self, count: usize) -> Result<PageRequest, CalendarError> {
        self.submit_page(PageDirection::Next, count, None)
    }

    /// Queue `count` months to be prepended before the first resident month.
    pub fn load_previous(&self, count: usize) -> Result<PageRequest, CalendarError> {
        self.submit_page(PageDirection::Previous, count, None)
    }

    /// Like [`load_next`](Self::load_next), calling `on_complete` after the commit.
    ///
    /// The callback runs on the worker thread, unless `count` is zero, in
    /// which case it runs before this call returns.
    pub fn load_next_with<F>(&self, count: usize, on_complete: F) -> Result<PageRequest, CalendarError>
    where
        F: FnOnce(&PageResult) + Send + 'static,
    {
        self.submit_page(PageDirection::Next, count, Some(Box::new(on_complete)))
    }

    /// Like [`load_previous`](Self::load_previous), calling `on_complete` after the commit.
    pub fn load_previous_with<F>(
        &self,
        count: usize,
        on_complete: F,
    ) -> Result<PageRequest, CalendarError>
    where
        F: FnOnce(&PageResult) + Send + 'static,
    {
        self.submit_page(PageDirection::Previous, count, Some(Box::new(on_complete)))
    }

    /// Append `count` months and wait for the commit.
    ///
    /// Must not be called from a slot or callback running on the worker
    /// thread; the job would wait for itself.
    pub fn load_next_blocking(&self, count: usize) -> PageResult {
        self.load_next(count)?.wait()
    }

    /// Prepend `count` months and wait for the commit.
    pub fn load_previous_blocking(&self, count: usize) -> PageResult {
        self.load_previous(count)?.wait()
    }

    fn submit_page(
        &self,
        direction: PageDirection,
        count: usize,
        on_complete: Option<Completion>,
    ) -> Result<PageRequest, CalendarError> {
        let (sender, receiver) = bounded(1);
        let request = PageRequest {
            direction,
            count,
            receiver,
            taken: AtomicBool::new(false),
        };

        if count == 0 {
            let result = Ok(PageOutcome::unchanged(direction, 0));
            if let Some(on_complete) = on_complete {
                on_complete(&result);
            }
            let _ = sender.send(result);
            return Ok(request);
        }

        let shared = self.shared().clone();
        self.worker().send(move || {
            let result = run_page_job(&shared, direction, count);
            match &result {
                Ok(outcome) => tracing::debug!(
                    target: targets::PAGER,
                    ?direction,
                    inserted = outcome.inserted.len(),
                    evicted = outcome.evicted.len(),
                    "pagination committed"
                ),
                Err(err) => tracing::warn!(
                    target: targets::PAGER,
                    ?direction,
                    count,
                    error = %err,
                    "pagination failed"
                ),
            }

            if let Some(on_complete) = on_complete {
                on_complete(&result);
            }
            if let Ok(outcome) = &result {
                if !outcome.is_unchanged() {
                    shared.window_changed.emit(WindowChange::Paged(outcome.clone()));
                }
            }
            // The requester may have dropped its handle.
            let _ = sender.send(result);
        })?;

        tracing::trace!(target: targets::PAGER, ?direction, count, "pagination queued");
        Ok(request)
    }
}

/// Build grids for `keys` in parallel, preserving order.
pub(crate) fn build_grids(
    keys: &[MonthKey],
    first_weekday: Weekday,
    today: Option<DateItem>,
) -> Result<Vec<MonthGrid>, InitError> {
    let _perf = PerfSpan::new("build_grids");
    keys.par_iter()
        .map(|&key| build_month_grid(key, first_weekday, today))
        .collect()
}

/// Months entering the window, earliest first.
///
/// At most `limit` months are built: when more are requested than the
/// window holds, only the ones that survive eviction are produced.
fn entering_months(
    anchor: MonthKey,
    direction: PageDirection,
    count: usize,
    limit: usize,
) -> Result<Vec<MonthKey>, InitError> {
    let built = count.min(limit);
    let count = i64::try_from(count).map_err(|_| InitError::UnsupportedMonth(anchor))?;
    let built_i64 = i64::try_from(built).map_err(|_| InitError::UnsupportedMonth(anchor))?;
    let first_step = match direction {
        PageDirection::Next => count - built_i64 + 1,
        PageDirection::Previous => -count,
    };

    (0..built_i64)
        .map(|step| {
            first_step
                .checked_add(step)
                .and_then(|offset| anchor.offset(offset))
                .ok_or(InitError::UnsupportedMonth(anchor))
        })
        .collect()
}

pub(crate) fn run_page_job(
    shared: &Shared,
    direction: PageDirection,
    count: usize,
) -> PageResult {
    let _perf = PerfSpan::new("page_job");

    loop {
        let (generation, anchor, today, window_len) = {
            let inner = shared.inner.lock();
            let edge = match direction {
                PageDirection::Next => inner.window.back(),
                PageDirection::Previous => inner.window.front(),
            };
            let Some(&anchor) = edge else {
                return Ok(PageOutcome::unchanged(direction, count));
            };
            (inner.generation, anchor, inner.today, inner.window.len())
        };

        let keys = entering_months(anchor, direction, count, window_len)?;
        let grids = build_grids(&keys, shared.first_weekday, Some(today))?;

        let mut inner = shared.inner.lock();
        if inner.generation != generation {
            tracing::trace!(
                target: targets::PAGER,
                "window changed while building pages, retrying"
            );
            continue;
        }

        inner.generation += 1;
        let mut evicted = Vec::with_capacity(keys.len());
        match direction {
            PageDirection::Next => {
                for grid in grids {
                    inner.window.push_back(grid.month());
                    inner.insert_page(grid);
                }
                for _ in 0..keys.len() {
                    if let Some(key) = inner.window.pop_front() {
                        inner.pages.remove(&key);
                        evicted.push(key);
                    }
                }
            }
            PageDirection::Previous => {
                for grid in grids.into_iter().rev() {
                    inner.window.push_front(grid.month());
                    inner.insert_page(grid);
                }
                for _ in 0..keys.len() {
                    if let Some(key) = inner.window.pop_back() {
                        inner.pages.remove(&key);
                        evicted.push(key);
                    }
                }
            }
        }
        debug_assert_eq!(inner.window.len(), inner.pages.len());

        return Ok(PageOutcome {
            direction,
            requested: count,
            inserted: keys,
            evicted,
        });
    }
}
