//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands, plus the
//! parsers that turn their text arguments into dates and interval drafts.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::editor::{parse_mileage, IntervalDraft};
use crate::error::{Error, Result};
use crate::model::parse_date_key;

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Month to show, as YYYY-MM (defaults to the current month)
    #[arg(short, long, value_name = "YYYY-MM")]
    pub month: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Log command arguments.
#[derive(Debug, Args)]
pub struct LogCommand {
    /// Day to log, as YYYY-MM-DD or "today"
    pub date: String,

    /// Interval as START-END, optionally followed by @MILES_START-MILES_END
    /// (e.g. 09:00-12:30@1200-1234.5). Repeat for several intervals.
    #[arg(short, long = "interval", value_name = "SPEC", required = true)]
    pub intervals: Vec<String>,
}

/// Day command arguments.
#[derive(Debug, Args)]
pub struct DayCommand {
    /// Day to show, as YYYY-MM-DD or "today"
    pub date: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Title command arguments.
#[derive(Debug, Args)]
pub struct TitleCommand {
    /// New project title. Prints the current one when omitted.
    pub title: Option<String>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Resolve a day argument: `today` or `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] for anything else.
pub fn parse_day(text: &str, today: NaiveDate) -> Result<NaiveDate> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("today") {
        return Ok(today);
    }
    parse_date_key(text).ok_or_else(|| Error::invalid_date(text, "expected YYYY-MM-DD or today"))
}

/// Parse `START-END[@MILES_START-MILES_END]` into a draft.
///
/// Times are not checked here; the editor reports bad times with the
/// interval's position. Either mileage side may be left blank.
///
/// # Errors
///
/// Returns an error if the separators are missing or a mileage is not a
/// number.
pub fn parse_interval_spec(spec: &str) -> Result<IntervalDraft> {
    let (times, miles) = match spec.trim().split_once('@') {
        Some((times, miles)) => (times, Some(miles)),
        None => (spec.trim(), None),
    };

    let (start, end) = times
        .split_once('-')
        .ok_or_else(|| bad_spec(spec, "expected START-END"))?;
    let draft = IntervalDraft::new(start.trim(), end.trim());

    let Some(miles) = miles else {
        return Ok(draft);
    };
    let (start_miles, end_miles) = miles
        .split_once('-')
        .ok_or_else(|| bad_spec(spec, "expected @MILES_START-MILES_END"))?;
    Ok(draft.with_mileage(
        mileage_field(spec, start_miles)?,
        mileage_field(spec, end_miles)?,
    ))
}

fn mileage_field(spec: &str, text: &str) -> Result<Option<f64>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_mileage(text)
        .map(Some)
        .ok_or_else(|| bad_spec(spec, &format!("'{}' is not a mileage", text.trim())))
}

fn bad_spec(spec: &str, message: &str) -> Error {
    Error::invalid_interval(spec.trim(), message)
}
