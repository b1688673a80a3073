//! Mapping relative offsets onto the synthetic calendar.

use chrono::{NaiveDateTime, TimeDelta};

/// Seconds in one hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Reference datetime shifted by an offset in seconds
///
/// The offset is rounded to whole milliseconds. Returns `None` for missing, non-finite
/// or out-of-range offsets.
#[must_use]
pub fn offset_datetime(reference: NaiveDateTime, seconds: Option<f64>) -> Option<NaiveDateTime> {
    let seconds = seconds.filter(|s| s.is_finite())?;
    let millis = (seconds * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_milliseconds(millis as i64)?;
    reference.checked_add_signed(delta)
}

/// Reference datetime shifted by a non-negative number of hours
///
/// Negative durations yield `None`.
#[must_use]
pub fn after_hours(reference: NaiveDateTime, hours: Option<f64>) -> Option<NaiveDateTime> {
    let hours = hours.filter(|h| *h >= 0.0)?;
    offset_datetime(reference, Some(hours * SECONDS_PER_HOUR))
}
