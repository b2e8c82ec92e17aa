//! Month navigation and the month grid shown to the user.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};

use crate::aggregate::{aggregate, month_prefix, month_totals, Totals};
use crate::error::{Error, Result};
use crate::model::{date_key, ProjectDocument};

/// The month currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthCursor {
    first: NaiveDate,
}

impl MonthCursor {
    /// Cursor for the month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// Cursor for a year and 1-based month.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    /// Parse `YYYY-MM`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid year and month.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::invalid_date(text, "expected YYYY-MM");
        let (year, month) = text.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }

    /// Calendar year.
    #[must_use]
    pub fn year(self) -> i32 {
        self.first.year()
    }

    /// Month number, 1 through 12.
    #[must_use]
    pub fn month(self) -> u32 {
        self.first.month()
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        self.first
    }

    /// The following month. Stays put at the end of the supported range.
    #[must_use]
    pub fn next(self) -> Self {
        self.first
            .checked_add_months(Months::new(1))
            .map_or(self, |first| Self { first })
    }

    /// The preceding month. Stays put at the start of the supported range.
    #[must_use]
    pub fn prev(self) -> Self {
        self.first
            .checked_sub_months(Months::new(1))
            .map_or(self, |first| Self { first })
    }

    /// Number of days in the month.
    #[must_use]
    pub fn days_in_month(self) -> u32 {
        self.first
            .checked_add_months(Months::new(1))
            .and_then(|next| u32::try_from((next - self.first).num_days()).ok())
            .unwrap_or(31)
    }

    /// The `YYYY-MM-` prefix of date keys in this month.
    #[must_use]
    pub fn prefix(self) -> String {
        month_prefix(self.year(), self.month())
    }

    /// Whether `date` falls in this month.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Human-readable label, e.g. `January 2024`.
    #[must_use]
    pub fn label(self) -> String {
        self.first.format("%B %Y").to_string()
    }
}

impl fmt::Display for MonthCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// One day of the month grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    /// Day of the month, starting at 1.
    pub day: u32,
    /// The calendar date.
    pub date: NaiveDate,
    /// Whether this is today.
    pub is_today: bool,
    /// Whether this day is after today. Future days can't be edited.
    pub is_future: bool,
    /// The day's totals, if anything was logged.
    pub totals: Option<Totals>,
}

/// Everything needed to draw a month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthView {
    /// The month shown.
    pub cursor: MonthCursor,
    /// Empty cells before the 1st, for weeks starting on Sunday.
    pub leading_blanks: u32,
    /// One cell per day.
    pub days: Vec<DayCell>,
    /// Totals over the whole month.
    pub totals: Totals,
}

impl MonthView {
    /// Build the view of `cursor`'s month.
    #[must_use]
    pub fn build(document: &ProjectDocument, cursor: MonthCursor, today: NaiveDate) -> Self {
        let days = cursor
            .first_day()
            .iter_days()
            .take_while(|date| cursor.contains(*date))
            .map(|date| DayCell {
                day: date.day(),
                date,
                is_today: date == today,
                is_future: date > today,
                totals: document.entries.get(&date_key(date)).map(aggregate),
            })
            .collect();

        Self {
            cursor,
            leading_blanks: cursor.first_day().weekday().num_days_from_sunday(),
            days,
            totals: month_totals(document, cursor.year(), cursor.month()),
        }
    }

    /// Cells laid out in Sunday-first weeks, `None` for padding.
    #[must_use]
    pub fn weeks(&self) -> Vec<[Option<&DayCell>; 7]> {
        let blanks = self.leading_blanks as usize;
        let slots = blanks + self.days.len();
        let mut weeks = vec![[None; 7]; slots.div_ceil(7)];
        for (i, cell) in self.days.iter().enumerate() {
            let pos = blanks + i;
            weeks[pos / 7][pos % 7] = Some(cell);
        }
        weeks
    }
}
