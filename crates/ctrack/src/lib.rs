//! `ctrack` - A calendar-backed log of working hours and mileage
//!
//! This library provides the data core: time arithmetic, display formatting,
//! per-day and per-month aggregation, and versioned persistence of the
//! project document with migration and write fallback.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod storage;
pub mod time;

pub use aggregate::{aggregate, month_totals, Totals};
pub use app::Tracker;
pub use calendar::{MonthCursor, MonthView};
pub use config::Config;
pub use editor::{EntryEditor, IntervalDraft, ValidationError};
pub use error::{Error, Result};
pub use format::{format_duration, format_miles};
pub use logging::init_logging;
pub use model::{DayEntry, Interval, ProjectDocument};
pub use storage::{KeyValueStore, MemoryStore, Persistence, SaveOutcome, SqliteStore};
pub use time::calculate_hours;
