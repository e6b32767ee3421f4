//! Calendar settings.
//!
//! [`CalendarSettings`] holds the non-visual configuration of a calendar:
//! the initial month, how many months a page shows, how many months are
//! preloaded on each side, the first weekday and the tap policy. Two
//! rendering hints (`show_in_out_days`, `autoresize_height`) travel with
//! them so a renderer can size and filter grid cells consistently.
//!
//! Settings round-trip through TOML:
//!
//! ```
//! use lattice_calendar::settings::CalendarSettings;
//! use lattice_calendar::Weekday;
//!
//! let settings = CalendarSettings::from_toml_str(r#"
//! paging_month_count = 2
//! first_weekday = "Mon"
//! selection_mode = "multiple"
//! "#).unwrap();
//!
//! assert_eq!(settings.first_weekday, Weekday::Mon);
//! assert_eq!(settings.window_size(), 5);
//! ```

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lattice_calendar_core::logging::targets;
use lattice_calendar_core::{DateItem, Day, DayKind, MonthGrid, Weekday, MAX_WEEKS_IN_MONTH};

use crate::error::{SettingsError, SettingsResult};
use crate::selection::SelectionMode;

/// Default number of months preloaded on each side of the visible page.
pub const DEFAULT_PAGING_MONTH_COUNT: usize = 60;

/// Default number of months on one page.
pub const DEFAULT_VISIBLE_MONTH_COUNT: usize = 1;

/// Configuration for a calendar and its month page cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Months preloaded before and after the visible page.
    pub paging_month_count: usize,
    /// Months shown on one page.
    pub visible_month_count: usize,
    /// Weekday shown in the first column.
    pub first_weekday: Weekday,
    pub selection_mode: SelectionMode,
    /// Whether in/out cells are drawn.
    pub show_in_out_days: bool,
    /// Whether a grid is drawn with its minimal row count instead of six rows.
    pub autoresize_height: bool,
    /// Month to open on. `None` opens on today's month.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<DateItem>,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            paging_month_count: DEFAULT_PAGING_MONTH_COUNT,
            visible_month_count: DEFAULT_VISIBLE_MONTH_COUNT,
            first_weekday: Weekday::Sun,
            selection_mode: SelectionMode::Single,
            show_in_out_days: true,
            autoresize_height: false,
            initial_date: None,
        }
    }
}

impl CalendarSettings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|err| SettingsError::io(path, err))?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "loaded calendar settings");
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save settings to a TOML file.
    ///
    /// The file is written to a temporary sibling first and then renamed
    /// over `path`.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        let temp_path = path.with_extension("toml.tmp");

        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&temp_path, path)
        };
        write().map_err(|err| {
            let _ = std::fs::remove_file(&temp_path);
            SettingsError::io(path, err)
        })?;

        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "saved calendar settings");
        Ok(())
    }

    /// Check that the settings describe a usable calendar.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.visible_month_count == 0 {
            return Err(SettingsError::invalid_value(
                "visible_month_count",
                "must be at least 1",
            ));
        }
        if self
            .paging_month_count
            .checked_mul(2)
            .and_then(|paging| paging.checked_add(self.visible_month_count))
            .is_none()
        {
            return Err(SettingsError::invalid_value(
                "paging_month_count",
                "window size overflows",
            ));
        }
        if let Some(date) = self.initial_date {
            if !date.is_valid() {
                return Err(SettingsError::invalid_value(
                    "initial_date",
                    format!("{date} is not a valid date"),
                ));
            }
        }
        Ok(())
    }

    /// Months resident in the cache: one page plus overscan on both sides.
    pub fn window_size(&self) -> usize {
        self.paging_month_count
            .saturating_mul(2)
            .saturating_add(self.visible_month_count)
    }

    /// Page size argument for visibility queries.
    pub fn page_size(&self) -> i64 {
        i64::try_from(self.visible_month_count).unwrap_or(i64::MAX)
    }

    /// Overscan argument for visibility queries.
    pub fn overscan(&self) -> i64 {
        i64::try_from(self.paging_month_count).unwrap_or(i64::MAX)
    }

    /// Rows a renderer should draw for `grid`.
    pub fn display_rows(&self, grid: &MonthGrid) -> usize {
        if self.autoresize_height {
            grid.weeks_count()
        } else {
            MAX_WEEKS_IN_MONTH
        }
    }

    /// Whether a renderer should draw `day`.
    pub fn is_cell_visible(&self, day: &Day) -> bool {
        self.show_in_out_days || day.kind == DayKind::Current
    }
}
