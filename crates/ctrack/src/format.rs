//! Compact display strings for hours and mileage.

/// Render elapsed hours as `"8h"` or `"8:30"`.
///
/// Minutes are rounded to the nearest whole minute. A round-up to sixty
/// carries into the hour.
///
/// ```
/// use ctrack::format::format_duration;
///
/// assert_eq!(format_duration(8.0), "8h");
/// assert_eq!(format_duration(8.5), "8:30");
/// assert_eq!(format_duration(0.5), "0:30");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_duration(hours: f64) -> String {
    if !hours.is_finite() {
        return "0h".to_string();
    }

    let mut whole = hours.floor() as i64;
    let mut minutes = ((hours - hours.floor()) * 60.0).round() as i64;
    if minutes == 60 {
        whole += 1;
        minutes = 0;
    }

    if minutes == 0 {
        format!("{whole}h")
    } else {
        format!("{whole}:{minutes:02}")
    }
}

/// Render a mileage figure for a calendar cell or summary line.
///
/// Whole numbers (after rounding to one decimal) get an `mi` suffix; other
/// values are shown bare with one decimal. Zero, `None` and NaN render as an
/// empty string so the cell stays blank.
///
/// ```
/// use ctrack::format::format_miles;
///
/// assert_eq!(format_miles(10.0), "10mi");
/// assert_eq!(format_miles(10.5), "10.5");
/// assert_eq!(format_miles(0.0), "");
/// assert_eq!(format_miles(None::<f64>), "");
/// ```
#[must_use]
pub fn format_miles(miles: impl Into<Option<f64>>) -> String {
    let Some(miles) = miles.into() else {
        return String::new();
    };
    if miles == 0.0 || !miles.is_finite() {
        return String::new();
    }

    let rounded = (miles * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}mi", rounded.trunc())
    } else {
        format!("{rounded:.1}")
    }
}
