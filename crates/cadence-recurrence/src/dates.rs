//! Calendar arithmetic helpers used by the occurrence generator.
//!
//! Everything here operates on UTC instants and preserves time-of-day; no
//! timezone database is involved.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Utc, Weekday};

/// Moves an instant forward (or backward) by whole days.
#[must_use]
pub fn add_days(dt: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    dt + TimeDelta::days(days)
}

/// Moves an instant forward (or backward) by whole weeks.
#[must_use]
pub fn add_weeks(dt: DateTime<Utc>, weeks: i64) -> DateTime<Utc> {
    dt + TimeDelta::weeks(weeks)
}

/// The same time-of-day on the Sunday starting the instant's week.
#[must_use]
pub fn start_of_week(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt - TimeDelta::days(i64::from(dt.weekday().num_days_from_sunday()))
}

/// ## Summary
/// Advances a date by a month count, clamping the day-of-month to the last
/// valid day of the target month (Jan 31 + 1 month = Feb 28/29). Month
/// counts beyond 12 roll over years. Negative counts move backwards.
///
/// Returns the input unchanged only if the result would leave chrono's
/// representable date range.
#[must_use]
pub fn add_months_safely(dt: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let shifted = if months >= 0 {
        dt.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        dt.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(dt)
}

/// Number of days in a month (1-12), or `None` for an invalid month.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(last.day())
}

/// ## Summary
/// The Nth occurrence of a weekday within a month: `n = 2` is the second,
/// `n = -1` the last. Returns `None` when that ordinal does not exist in
/// the month (there is no fifth Monday in most months) — callers must not
/// roll over to a neighboring month.
#[must_use]
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: i32) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }

    let month_len = days_in_month(year, month)?;
    let target = weekday.num_days_from_sunday();

    let day = if n > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let offset = (target + 7 - first.weekday().num_days_from_sunday()) % 7;
        let day = 1 + offset + (n.unsigned_abs() - 1) * 7;
        (day <= month_len).then_some(day)?
    } else {
        let last = NaiveDate::from_ymd_opt(year, month, month_len)?;
        let offset = (last.weekday().num_days_from_sunday() + 7 - target) % 7;
        let back = offset + (n.unsigned_abs() - 1) * 7;
        (back < month_len).then_some(month_len - back)?
    };

    NaiveDate::from_ymd_opt(year, month, day)
}
