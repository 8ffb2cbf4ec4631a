//! Whole-month date arithmetic shared by registration, payment recording,
//! and the rollover engine.

use chrono::{Months, NaiveDate};

/// Advances `date` by `months` whole months, clamping day-of-month the way calendar
/// arithmetic does (Jan 31 + 1 month = Feb 28/29).
///
/// `months` is a plan duration and is validated as positive at plan creation; a
/// non-positive value here returns `date` unchanged.
#[must_use]
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    u32::try_from(months).map_or(date, |m| {
        date.checked_add_months(Months::new(m)).unwrap_or(date)
    })
}

/// Signed number of whole days from `from` to `to`. Negative when `to` is in the past.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
