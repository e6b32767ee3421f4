//! Selection ledger and tap policy.
//!
//! The [`SelectionLedger`] is the ordered list of selected days, kept apart
//! from any grid. Grid cells only mirror it: whenever a grid enters the
//! month window the ledger is projected onto it, so a date selected in one
//! month also shows as selected where an adjacent grid borrows it as an
//! in/out day. Evicting a grid never touches the ledger.
//!
//! # Example
//!
//! ```
//! use lattice_calendar::selection::{plan_tap, SelectionLedger, SelectionMode, TapPlan};
//! use lattice_calendar::{DateItem, Weekday};
//!
//! let mut ledger = SelectionLedger::new();
//! let day = SelectionLedger::day_for(DateItem::new(2017, 3, 17), Weekday::Sun, None).unwrap();
//! ledger.push(day);
//!
//! // Tapping the same day again toggles it off.
//! assert_eq!(plan_tap(SelectionMode::Single, &ledger, &day), TapPlan::Deselect(day));
//! ```

use serde::{Deserialize, Serialize};

use lattice_calendar_core::{weekday_index, DateItem, Day, DayKind, MonthGrid, Weekday};

/// How a tap on a day cell changes the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// At most one day is selected; a tap replaces the previous selection.
    #[default]
    Single,
    /// Taps accumulate selections.
    Multiple,
}

/// A committed selection change, emitted by the cache's `selection_changed` signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionChange {
    /// The day that became selected, if any.
    pub selected: Option<Day>,
    /// Days that stopped being selected, in the order they were removed.
    pub deselected: Vec<Day>,
}

impl SelectionChange {
    /// A change that selects one day.
    pub fn selected(day: Day) -> Self {
        Self {
            selected: Some(day),
            deselected: Vec::new(),
        }
    }

    /// A change that deselects one day.
    pub fn deselected(day: Day) -> Self {
        Self {
            selected: None,
            deselected: vec![day],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none() && self.deselected.is_empty()
    }
}

/// What a tap on a day should do, given the current ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapPlan {
    /// In/out days are not selectable.
    Ignore,
    /// Deselect this ledger entry.
    Deselect(Day),
    /// Select `day`, after deselecting `replace` if set.
    Select { day: Day, replace: Option<Day> },
}

/// Decide what a tap on `day` does.
pub fn plan_tap(mode: SelectionMode, ledger: &SelectionLedger, day: &Day) -> TapPlan {
    if day.kind == DayKind::InOut {
        return TapPlan::Ignore;
    }
    if let Some(selected) = ledger.get(&day.date) {
        return TapPlan::Deselect(*selected);
    }
    let replace = match mode {
        SelectionMode::Single => ledger.last().copied(),
        SelectionMode::Multiple => None,
    };
    TapPlan::Select { day: *day, replace }
}

/// Predicate consulted before a tap selects or deselects a day.
pub type DayPredicate = Box<dyn Fn(&Day) -> bool + Send + Sync>;

/// Vetoes applied to taps. A missing predicate allows everything.
#[derive(Default)]
pub struct TapPolicy {
    should_select: Option<DayPredicate>,
    should_deselect: Option<DayPredicate>,
}

impl TapPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `predicate` before a tap selects a day.
    pub fn with_should_select<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Day) -> bool + Send + Sync + 'static,
    {
        self.should_select = Some(Box::new(predicate));
        self
    }

    /// Consult `predicate` before a tap deselects a day, including the
    /// replaced selection in single mode.
    pub fn with_should_deselect<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Day) -> bool + Send + Sync + 'static,
    {
        self.should_deselect = Some(Box::new(predicate));
        self
    }

    pub fn allows_select(&self, day: &Day) -> bool {
        self.should_select.as_ref().is_none_or(|predicate| predicate(day))
    }

    pub fn allows_deselect(&self, day: &Day) -> bool {
        self.should_deselect.as_ref().is_none_or(|predicate| predicate(day))
    }

    /// Narrow `plan` to what the predicates allow.
    ///
    /// A vetoed replacement blocks the selection as well, since single mode
    /// cannot hold two days. A vetoed selection still lets an allowed
    /// replacement go through.
    pub fn resolve(&self, plan: TapPlan) -> TapPlan {
        match plan {
            TapPlan::Ignore => TapPlan::Ignore,
            TapPlan::Deselect(day) if self.allows_deselect(&day) => TapPlan::Deselect(day),
            TapPlan::Deselect(_) => TapPlan::Ignore,
            TapPlan::Select {
                day,
                replace: Some(last),
            } => {
                if !self.allows_deselect(&last) {
                    TapPlan::Ignore
                } else if self.allows_select(&day) {
                    plan
                } else {
                    TapPlan::Deselect(last)
                }
            }
            TapPlan::Select { day, replace: None } if self.allows_select(&day) => plan,
            TapPlan::Select { replace: None, .. } => TapPlan::Ignore,
        }
    }
}

impl std::fmt::Debug for TapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapPolicy")
            .field("should_select", &self.should_select.is_some())
            .field("should_deselect", &self.should_deselect.is_some())
            .finish()
    }
}

/// Ordered list of selected days. The last entry is the most recent selection.
///
/// Entries are always `Current`-kind days with `is_selected` set, and no
/// date appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionLedger {
    days: Vec<Day>,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ledger entry for `date`: a `Current` day in its own month.
    ///
    /// Returns `None` if `date` is not a real calendar day.
    pub fn day_for(date: DateItem, first_weekday: Weekday, today: Option<DateItem>) -> Option<Day> {
        let weekday = date.weekday()?;
        Some(Day {
            date,
            weekday,
            weekday_index: weekday_index(weekday, first_weekday),
            kind: DayKind::Current,
            is_today: today == Some(date),
            is_selected: true,
        })
    }

    /// Append a selection. Returns `false` if the date is already selected.
    pub fn push(&mut self, day: Day) -> bool {
        if self.contains(&day.date) {
            return false;
        }
        self.days.push(Day {
            kind: DayKind::Current,
            is_selected: true,
            ..day
        });
        true
    }

    /// Remove the first entry for `date`.
    pub fn remove(&mut self, date: &DateItem) -> Option<Day> {
        let position = self.days.iter().position(|day| day.date == *date)?;
        Some(self.days.remove(position))
    }

    /// Remove the most recent selection.
    pub fn pop(&mut self) -> Option<Day> {
        self.days.pop()
    }

    /// Remove every entry, oldest first.
    pub fn drain(&mut self) -> Vec<Day> {
        std::mem::take(&mut self.days)
    }

    /// The ledger entry for `date`, if selected.
    pub fn get(&self, date: &DateItem) -> Option<&Day> {
        self.days.iter().find(|day| day.date == *date)
    }

    pub fn contains(&self, date: &DateItem) -> bool {
        self.days.iter().any(|day| day.date == *date)
    }

    pub fn last(&self) -> Option<&Day> {
        self.days.last()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Day> {
        self.days.iter()
    }

    pub fn as_slice(&self) -> &[Day] {
        &self.days
    }

    /// Mark every ledger date the grid shows, in/out cells included.
    ///
    /// Returns the number of cells that changed.
    pub fn project_onto(&self, grid: &mut MonthGrid) -> usize {
        self.days
            .iter()
            .filter(|day| grid.set_selected(&day.date, true))
            .count()
    }

    /// Refresh the `is_today` flag of each entry.
    pub(crate) fn mark_today(&mut self, today: DateItem) {
        for day in &mut self.days {
            day.is_today = day.date == today;
        }
    }
}
