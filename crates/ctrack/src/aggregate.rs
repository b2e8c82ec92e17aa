//! Day and month totals.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::model::{DayEntry, ProjectDocument};

/// Hours and miles summed over some set of intervals or entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Total elapsed hours.
    pub hours: f64,
    /// Total miles.
    pub miles: f64,
}

impl Add for Totals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hours: self.hours + rhs.hours,
            miles: self.miles + rhs.miles,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Totals for one day.
///
/// Sums the intervals when there are any, otherwise falls back to the
/// entry's own stored totals.
#[must_use]
pub fn aggregate(entry: &DayEntry) -> Totals {
    if entry.intervals.is_empty() {
        return Totals {
            hours: entry.hours,
            miles: entry.miles,
        };
    }

    entry
        .intervals
        .iter()
        .map(|interval| Totals {
            hours: interval.hours,
            miles: interval.miles,
        })
        .sum()
}

/// The `YYYY-MM-` prefix shared by every date key in a month.
#[must_use]
pub fn month_prefix(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}-")
}

/// Entries falling in the given month, in date order.
pub fn entries_in_month(
    document: &ProjectDocument,
    year: i32,
    month: u32,
) -> impl Iterator<Item = (&String, &DayEntry)> {
    let prefix = month_prefix(year, month);
    document
        .entries
        .iter()
        .filter(move |(key, _)| key.starts_with(&prefix))
}

/// Totals across every entry in the given month.
#[must_use]
pub fn month_totals(document: &ProjectDocument, year: i32, month: u32) -> Totals {
    entries_in_month(document, year, month)
        .map(|(_, entry)| aggregate(entry))
        .sum()
}
