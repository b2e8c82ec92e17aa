//! The stored project document.
//!
//! A [`ProjectDocument`] maps date keys (`YYYY-MM-DD`) to [`DayEntry`]
//! records, each made of one or more [`Interval`]s. Field names serialize in
//! camelCase so documents written by earlier versions of the tracker load
//! unchanged.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, Totals};
use crate::storage::migrations::CURRENT_VERSION;
use crate::time::calculate_hours;

/// Title given to a project that has never been named.
pub const DEFAULT_PROJECT_TITLE: &str = "Plants";

/// Format of a date key.
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Build the date key for a local calendar date.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a date key back into a calendar date.
#[must_use]
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Miles driven between two odometer readings.
///
/// Only counts when both readings are present, finite and non-negative.
#[must_use]
pub fn mileage_delta(start: Option<f64>, end: Option<f64>) -> f64 {
    match (start, end) {
        (Some(start), Some(end))
            if start.is_finite() && end.is_finite() && start >= 0.0 && end >= 0.0 =>
        {
            end - start
        }
        _ => 0.0,
    }
}

/// One contiguous work session within a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Interval {
    /// Start time as `HH:MM`, empty if not set.
    pub start_time: String,
    /// End time as `HH:MM`, empty if not set.
    pub end_time: String,
    /// Odometer reading at the start.
    pub start_mileage: Option<f64>,
    /// Odometer reading at the end.
    pub end_mileage: Option<f64>,
    /// Elapsed hours, derived from the times.
    pub hours: f64,
    /// Miles driven, derived from the odometer readings.
    pub miles: f64,
}

impl Interval {
    /// Create an interval and compute its derived hours and miles.
    #[must_use]
    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        start_mileage: Option<f64>,
        end_mileage: Option<f64>,
    ) -> Self {
        let mut interval = Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            start_mileage,
            end_mileage,
            hours: 0.0,
            miles: 0.0,
        };
        interval.recompute();
        interval
    }

    /// Refresh `hours` and `miles` from the raw fields.
    pub fn recompute(&mut self) {
        self.hours = calculate_hours(&self.start_time, &self.end_time);
        self.miles = mileage_delta(self.start_mileage, self.end_mileage);
    }
}

/// Everything logged for a single calendar day.
///
/// `hours` and `miles` cache the sum over `intervals`. Entries written before
/// intervals existed have no intervals and keep their own totals, along with
/// the flat `startTime`/`endTime` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    /// Work sessions, in the order they were entered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intervals: Vec<Interval>,
    /// Total hours for the day.
    #[serde(default)]
    pub hours: f64,
    /// Total miles for the day.
    #[serde(default)]
    pub miles: f64,
    /// Legacy single start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Legacy single end time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl DayEntry {
    /// Build an entry from intervals, computing the cached totals.
    #[must_use]
    pub fn from_intervals(intervals: Vec<Interval>) -> Self {
        let mut entry = Self {
            intervals,
            ..Self::default()
        };
        entry.recompute();
        entry
    }

    /// Whether this entry uses the interval shape.
    #[must_use]
    pub fn has_intervals(&self) -> bool {
        !self.intervals.is_empty()
    }

    /// Current totals for the day.
    #[must_use]
    pub fn totals(&self) -> Totals {
        aggregate(self)
    }

    /// Rewrite the cached totals from the intervals.
    ///
    /// Legacy entries without intervals are left alone.
    pub fn recompute(&mut self) {
        if self.has_intervals() {
            let totals = aggregate(self);
            self.hours = totals.hours;
            self.miles = totals.miles;
        }
    }
}

/// The whole persisted project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    /// Schema version of this document.
    #[serde(default)]
    pub version: u32,
    /// Display title of the project.
    #[serde(default = "default_title")]
    pub project_title: String,
    /// Day entries keyed by `YYYY-MM-DD`.
    #[serde(default)]
    pub entries: BTreeMap<String, DayEntry>,
}

fn default_title() -> String {
    DEFAULT_PROJECT_TITLE.to_string()
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_TITLE)
    }
}

impl ProjectDocument {
    /// Create an empty document at the current schema version.
    #[must_use]
    pub fn new(project_title: impl Into<String>) -> Self {
        Self {
            version: CURRENT_VERSION,
            project_title: project_title.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Look up the entry for a date.
    #[must_use]
    pub fn entry(&self, date: NaiveDate) -> Option<&DayEntry> {
        self.entries.get(&date_key(date))
    }

    /// Replace the entry for a date, returning the previous one.
    pub fn set_entry(&mut self, date: NaiveDate, entry: DayEntry) -> Option<DayEntry> {
        self.entries.insert(date_key(date), entry)
    }
}
