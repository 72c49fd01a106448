//! Calendar-aware duration measurement.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

use crate::types::day_start;

/// Measures `[start, end]`, excluding any portion that falls on a Saturday
/// or Sunday. Returns zero when `end <= start`.
#[must_use]
pub fn working_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    let mut total = Duration::zero();
    if end <= start {
        return total;
    }

    let mut cursor = start;
    while cursor < end {
        let next_midnight = day_start(cursor.date_naive() + Duration::days(1));
        let slice_end = next_midnight.min(end);
        if !is_weekend(cursor.weekday()) {
            total += slice_end - cursor;
        }
        cursor = next_midnight;
    }
    total
}

const fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}
