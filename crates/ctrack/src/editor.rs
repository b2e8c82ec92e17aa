//! Editing state for a single day.
//!
//! An [`EntryEditor`] holds an ordered list of [`IntervalDraft`]s and a
//! cursor pointing at the one being edited. It knows nothing about how it is
//! displayed; a front end reads the drafts, applies user input through the
//! editor's methods, and calls [`EntryEditor::commit`] when the user saves.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::aggregate::{aggregate, Totals};
use crate::model::{DayEntry, Interval};
use crate::time::{format_time, is_valid_time};

/// Parse a mileage input field. Blank or non-numeric text is `None`.
#[must_use]
pub fn parse_mileage(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|miles| miles.is_finite())
}

/// Raw, unvalidated form values for one interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalDraft {
    /// Start time as typed.
    pub start_time: String,
    /// End time as typed.
    pub end_time: String,
    /// Starting odometer reading.
    pub start_mileage: Option<f64>,
    /// Ending odometer reading.
    pub end_mileage: Option<f64>,
}

impl IntervalDraft {
    /// Create a draft from time strings, without mileage.
    #[must_use]
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            ..Self::default()
        }
    }

    /// Add odometer readings to the draft.
    #[must_use]
    pub fn with_mileage(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_mileage = start;
        self.end_mileage = end;
        self
    }

    fn from_interval(interval: &Interval) -> Self {
        Self {
            start_time: interval.start_time.clone(),
            end_time: interval.end_time.clone(),
            start_mileage: interval.start_mileage,
            end_mileage: interval.end_mileage,
        }
    }

    /// Everything wrong with this draft, empty if it can be saved.
    #[must_use]
    pub fn problems(&self) -> Vec<IntervalProblem> {
        let mut problems = Vec::new();

        let start_ok = check_time(
            &self.start_time,
            IntervalProblem::MissingStartTime,
            IntervalProblem::MalformedStartTime,
            &mut problems,
        );
        let end_ok = check_time(
            &self.end_time,
            IntervalProblem::MissingEndTime,
            IntervalProblem::MalformedEndTime,
            &mut problems,
        );
        if start_ok && end_ok && self.start_time.trim() == self.end_time.trim() {
            problems.push(IntervalProblem::EndNotAfterStart);
        }

        let readings = [self.start_mileage, self.end_mileage];
        if readings.iter().flatten().any(|miles| *miles < 0.0) {
            problems.push(IntervalProblem::NegativeMileage);
        } else if let (Some(start), Some(end)) = (self.start_mileage, self.end_mileage) {
            if end < start {
                problems.push(IntervalProblem::MileageDecreased);
            }
        }

        problems
    }

    /// Build the stored interval with derived hours and miles.
    #[must_use]
    pub fn to_interval(&self) -> Interval {
        Interval::new(
            self.start_time.trim(),
            self.end_time.trim(),
            self.start_mileage,
            self.end_mileage,
        )
    }
}

/// Returns true when `time` is present and well formed.
fn check_time(
    time: &str,
    missing: IntervalProblem,
    malformed: IntervalProblem,
    problems: &mut Vec<IntervalProblem>,
) -> bool {
    let time = time.trim();
    if time.is_empty() {
        problems.push(missing);
        false
    } else if !is_valid_time(time) {
        problems.push(malformed);
        false
    } else {
        true
    }
}

/// A reason an interval cannot be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalProblem {
    /// No start time entered.
    MissingStartTime,
    /// Start time is not `HH:MM`.
    MalformedStartTime,
    /// No end time entered.
    MissingEndTime,
    /// End time is not `HH:MM`.
    MalformedEndTime,
    /// End time equals start time.
    EndNotAfterStart,
    /// An odometer reading is below zero.
    NegativeMileage,
    /// Ending odometer reading is below the starting one.
    MileageDecreased,
}

impl fmt::Display for IntervalProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingStartTime => "start time is missing",
            Self::MalformedStartTime => "start time must be HH:MM",
            Self::MissingEndTime => "end time is missing",
            Self::MalformedEndTime => "end time must be HH:MM",
            Self::EndNotAfterStart => "end time must be after start time",
            Self::NegativeMileage => "mileage cannot be negative",
            Self::MileageDecreased => "end mileage is less than start mileage",
        };
        f.write_str(text)
    }
}

/// A problem tied to an interval's 1-based position in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalIssue {
    /// Position of the interval, starting at 1.
    pub position: usize,
    /// What is wrong with it.
    pub problem: IntervalProblem,
}

/// Every issue found while validating a day, in form order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The issues found. Never empty when returned from validation.
    pub issues: Vec<IntervalIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry not saved:")?;
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(f, "{sep}interval {}: {}", issue.position, issue.problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Form state for editing one day's intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEditor {
    date: NaiveDate,
    intervals: Vec<IntervalDraft>,
    current: usize,
}

impl EntryEditor {
    /// Start editing `date`, seeded from its existing entry if any.
    ///
    /// The cursor starts on the last interval.
    #[must_use]
    pub fn open(date: NaiveDate, existing: Option<&DayEntry>) -> Self {
        let intervals: Vec<IntervalDraft> = match existing {
            Some(entry) if entry.has_intervals() => entry
                .intervals
                .iter()
                .map(IntervalDraft::from_interval)
                .collect(),
            Some(entry) => vec![IntervalDraft::new(
                entry.start_time.clone().unwrap_or_default(),
                entry.end_time.clone().unwrap_or_default(),
            )],
            None => vec![IntervalDraft::default()],
        };

        let current = intervals.len() - 1;
        Self {
            date,
            intervals,
            current,
        }
    }

    /// The day being edited.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// All drafts in order.
    #[must_use]
    pub fn intervals(&self) -> &[IntervalDraft] {
        &self.intervals
    }

    /// Index of the draft under the cursor.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The draft under the cursor.
    #[must_use]
    pub fn current(&self) -> &IntervalDraft {
        &self.intervals[self.current]
    }

    /// Mutable access to the draft under the cursor.
    pub fn current_mut(&mut self) -> &mut IntervalDraft {
        &mut self.intervals[self.current]
    }

    /// Append a draft continuing from the last one and move to it.
    ///
    /// The new draft starts where the previous one ended, in both time and
    /// odometer reading.
    pub fn add_interval(&mut self) {
        let draft = self
            .intervals
            .last()
            .map(|last| IntervalDraft {
                start_time: last.end_time.clone(),
                start_mileage: last.end_mileage,
                ..IntervalDraft::default()
            })
            .unwrap_or_default();
        self.intervals.push(draft);
        self.current = self.intervals.len() - 1;
    }

    /// Remove the draft under the cursor. The last remaining draft stays.
    pub fn remove_current(&mut self) -> bool {
        if self.intervals.len() <= 1 {
            return false;
        }
        self.intervals.remove(self.current);
        self.current = self.current.min(self.intervals.len() - 1);
        true
    }

    /// Move the cursor to `index` if it exists.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.intervals.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Move the cursor forward one draft.
    pub fn next(&mut self) -> bool {
        self.select(self.current + 1)
    }

    /// Move the cursor back one draft.
    pub fn prev(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Set the current draft's start time to `time`.
    pub fn stamp_start(&mut self, time: NaiveTime) {
        self.current_mut().start_time = format_time(time);
    }

    /// Set the current draft's end time to `time`.
    pub fn stamp_end(&mut self, time: NaiveTime) {
        self.current_mut().end_time = format_time(time);
    }

    /// Running totals of the drafts as they stand, ignoring validity.
    #[must_use]
    pub fn preview_totals(&self) -> Totals {
        aggregate(&self.build_entry())
    }

    /// Check every draft.
    ///
    /// # Errors
    ///
    /// Returns every problem found, tagged with the draft's position.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let issues: Vec<IntervalIssue> = self
            .intervals
            .iter()
            .enumerate()
            .flat_map(|(index, draft)| {
                draft.problems().into_iter().map(move |problem| IntervalIssue {
                    position: index + 1,
                    problem,
                })
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Validate and build the day's entry.
    ///
    /// # Errors
    ///
    /// Returns the validation failure; nothing is partially built.
    pub fn commit(&self) -> Result<DayEntry, ValidationError> {
        self.validate()?;
        Ok(self.build_entry())
    }

    fn build_entry(&self) -> DayEntry {
        DayEntry::from_intervals(self.intervals.iter().map(IntervalDraft::to_interval).collect())
    }
}
