//! Wall-clock time arithmetic.
//!
//! Times of day are carried around as `"HH:MM"` strings, the same shape the
//! stored document uses. Everything here fails soft: malformed input turns
//! into zero hours rather than an error, and strict checking is left to the
//! entry editor.

use std::sync::OnceLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Strict `HH:MM` with a 24-hour clock.
const TIME_PATTERN: &str = r"^(?:[01]\d|2[0-3]):[0-5]\d$";

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIME_PATTERN).expect("time pattern is valid"))
}

/// Parse `"H:M"` into minutes since midnight.
///
/// Returns `None` for empty input, when either component is not a number,
/// or when the total does not fit in an `i64`. Out-of-range components are
/// not rejected here.
#[must_use]
pub fn parse_minutes(time: &str) -> Option<i64> {
    let time = time.trim();
    if time.is_empty() {
        return None;
    }

    let (hours, minutes) = time.split_once(':')?;
    let hours: i64 = hours.trim().parse().ok()?;
    let minutes: i64 = minutes.trim().parse().ok()?;
    hours.checked_mul(60)?.checked_add(minutes)
}

/// Elapsed hours between two `"HH:MM"` times.
///
/// The difference wraps modulo one day, so an end time earlier than the start
/// is read as the next morning: `23:00` to `01:00` is two hours. Identical
/// times give zero. Empty or unparseable input gives zero.
///
/// ```
/// use ctrack::time::calculate_hours;
///
/// assert_eq!(calculate_hours("09:00", "17:00"), 8.0);
/// assert_eq!(calculate_hours("23:00", "01:00"), 2.0);
/// assert_eq!(calculate_hours("", "17:00"), 0.0);
/// ```
#[must_use]
pub fn calculate_hours(start_time: &str, end_time: &str) -> f64 {
    let (Some(start), Some(end)) = (parse_minutes(start_time), parse_minutes(end_time)) else {
        return 0.0;
    };

    let Some(difference) = end.checked_sub(start) else {
        return 0.0;
    };
    let elapsed = difference.rem_euclid(MINUTES_PER_DAY);
    #[allow(clippy::cast_precision_loss)]
    let elapsed = elapsed as f64;
    elapsed / 60.0
}

/// Whether `time` is a well-formed `HH:MM` between `00:00` and `23:59`.
#[must_use]
pub fn is_valid_time(time: &str) -> bool {
    time_regex().is_match(time)
}

/// Render a wall-clock time as `HH:MM`, dropping seconds.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
