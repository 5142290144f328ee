/*!
Miscellaneous date utilities for `closecast`
*/

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// The first day of the calendar quarter containing `date`
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = ((date.month() - 1) / 3) * 3 + 1;
    date.with_day(1)
        .and_then(|d| d.with_month(month))
        .unwrap_or(date)
}

/// The current quarter as `(first day of quarter, today)`
pub fn quarter_dates(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (quarter_start(today), today)
}

/// Whether `date` falls on a weekday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The `count` business days strictly after `after`
pub fn next_business_days(after: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut date = after;
    while days.len() < count {
        date = date + Duration::days(1);
        if is_business_day(date) {
            days.push(date)
        }
    }
    days
}

/// Split an elapsed duration into whole minutes and remaining (fractional) seconds
pub fn minutes_seconds(elapsed: std::time::Duration) -> (u64, f64) {
    let secs = elapsed.as_secs_f64();
    let minutes = (secs / 60.0).floor();
    (minutes as u64, secs - minutes * 60.0)
}
