//! Series-length estimation and count-to-end-date normalization.
//!
//! Job discovery uses these to size windows and workloads without running
//! the full generator: the numbers are deliberately coarse.

use chrono::{DateTime, TimeDelta, Utc};

use crate::dates::{add_days, add_months_safely, add_weeks};
use crate::error::{RecurrenceError, RecurrenceResult};
use crate::rule::{Frequency, RecurrenceRule};

const DEFAULT_ESTIMATION_MONTHS: u32 = 12;

/// ## Summary
/// The instant at which a count-bounded series completes: the start of its
/// last occurrence, `(count - 1) * interval` frequency steps after the
/// series start. BYDAY fan-out is ignored, so the result is an upper bound
/// and a window clamped to it never truncates the series.
///
/// ## Errors
/// Returns [`RecurrenceError::IntervalOutOfRange`] when the interval is
/// below 1.
pub fn completion_date_from_count(
    series_start: DateTime<Utc>,
    count: u32,
    freq: Frequency,
    interval: i32,
) -> RecurrenceResult<DateTime<Utc>> {
    if interval < 1 {
        return Err(RecurrenceError::IntervalOutOfRange);
    }

    let steps = i64::from(count.saturating_sub(1)) * i64::from(interval);
    let completed = match freq {
        Frequency::Daily => add_days(series_start, steps),
        Frequency::Weekly => add_weeks(series_start, steps),
        Frequency::Monthly => add_months_safely(series_start, i32::try_from(steps).unwrap_or(i32::MAX)),
        Frequency::Yearly => add_months_safely(
            series_start,
            i32::try_from(steps.saturating_mul(12)).unwrap_or(i32::MAX),
        ),
    };
    Ok(completed)
}

/// ## Summary
/// Resolves the effective end instant of a series: an explicit `until` wins,
/// otherwise a `count` is converted to a completion date, otherwise the
/// series is never-ending and `None` is returned.
///
/// ## Errors
/// Returns [`RecurrenceError::IntervalOutOfRange`] when a count-bounded
/// rule carries an interval below 1.
pub fn normalize_to_end_date(
    rule: &RecurrenceRule,
    series_start: DateTime<Utc>,
) -> RecurrenceResult<Option<DateTime<Utc>>> {
    if let Some(until) = rule.until {
        return Ok(Some(until));
    }

    match rule.count {
        Some(count) => {
            completion_date_from_count(series_start, count, rule.freq, rule.interval).map(Some)
        }
        None => Ok(None),
    }
}

/// ## Summary
/// Coarse estimate of how many instances a rule produces.
///
/// A count is taken at face value. An end date is converted through flat
/// period lengths (7/30/365 days), rounding up, with daily series counting
/// both endpoints. Never-ending series are estimated over
/// `estimation_months` (default 12). Always at least 1.
#[must_use]
pub fn estimate_instance_count(
    rule: &RecurrenceRule,
    series_start: DateTime<Utc>,
    estimation_months: Option<u32>,
) -> u32 {
    if let Some(count) = rule.count {
        return count.max(1);
    }

    let interval = u32::try_from(rule.interval).unwrap_or(1).max(1);

    if let Some(end) = rule.until {
        let diff_days = days_between_rounded_up(series_start, end);
        let estimate = match rule.freq {
            Frequency::Daily => diff_days / interval + 1,
            Frequency::Weekly => diff_days.div_ceil(7 * interval),
            Frequency::Monthly => diff_days.div_ceil(30 * interval),
            Frequency::Yearly => diff_days.div_ceil(365 * interval),
        };
        return estimate.max(1);
    }

    let months = estimation_months.unwrap_or(DEFAULT_ESTIMATION_MONTHS);
    let estimate = match rule.freq {
        Frequency::Daily => months * 30 / interval,
        Frequency::Weekly => months * 13 / 3 / interval,
        Frequency::Monthly => months / interval,
        Frequency::Yearly => months / (12 * interval),
    };
    estimate.max(1)
}

fn days_between_rounded_up(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let delta = end.signed_duration_since(start).max(TimeDelta::zero());
    let whole_days = delta.num_days();
    let days = if delta - TimeDelta::days(whole_days) > TimeDelta::zero() {
        whole_days + 1
    } else {
        whole_days
    };
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn rule(freq: Frequency) -> RecurrenceRule {
        RecurrenceRule::new(freq)
    }

    #[test]
    fn completion_date_steps_by_frequency_and_interval() {
        let start = utc("2025-01-01T00:00:00Z");
        assert_eq!(
            completion_date_from_count(start, 10, Frequency::Daily, 1).unwrap(),
            utc("2025-01-10T00:00:00Z")
        );
        assert_eq!(
            completion_date_from_count(start, 5, Frequency::Weekly, 2).unwrap(),
            utc("2025-02-26T00:00:00Z")
        );
        assert_eq!(
            completion_date_from_count(start, 6, Frequency::Monthly, 1).unwrap(),
            utc("2025-06-01T00:00:00Z")
        );
        assert_eq!(
            completion_date_from_count(start, 3, Frequency::Yearly, 1).unwrap(),
            utc("2027-01-01T00:00:00Z")
        );
    }

    #[test]
    fn completion_date_rejects_interval_below_one() {
        let start = utc("2025-01-01T00:00:00Z");
        assert!(completion_date_from_count(start, 5, Frequency::Daily, 0).is_err());
    }

    #[test]
    fn normalize_prefers_explicit_until() {
        let start = utc("2025-01-01T00:00:00Z");
        let bounded = RecurrenceRule {
            count: Some(5),
            until: Some(utc("2025-01-05T00:00:00Z")),
            ..rule(Frequency::Daily)
        };
        assert_eq!(
            normalize_to_end_date(&bounded, start).unwrap(),
            Some(utc("2025-01-05T00:00:00Z"))
        );

        let counted = RecurrenceRule {
            count: Some(5),
            ..rule(Frequency::Daily)
        };
        assert_eq!(
            normalize_to_end_date(&counted, start).unwrap(),
            Some(utc("2025-01-05T00:00:00Z"))
        );

        assert_eq!(
            normalize_to_end_date(&rule(Frequency::Daily), start).unwrap(),
            None
        );
    }

    #[test]
    fn estimates_from_count_end_date_and_defaults() {
        let start = utc("2025-01-01T00:00:00Z");

        let counted = RecurrenceRule {
            count: Some(10),
            ..rule(Frequency::Daily)
        };
        assert_eq!(estimate_instance_count(&counted, start, None), 10);

        let daily_until = RecurrenceRule {
            until: Some(utc("2025-01-10T00:00:00Z")),
            ..rule(Frequency::Daily)
        };
        assert_eq!(estimate_instance_count(&daily_until, start, None), 10);

        let weekly_until = RecurrenceRule {
            until: Some(utc("2025-03-01T00:00:00Z")),
            ..rule(Frequency::Weekly)
        };
        assert_eq!(estimate_instance_count(&weekly_until, start, None), 9);

        let monthly_until = RecurrenceRule {
            until: Some(utc("2026-01-01T00:00:00Z")),
            ..rule(Frequency::Monthly)
        };
        assert_eq!(estimate_instance_count(&monthly_until, start, None), 13);

        let yearly_until = RecurrenceRule {
            until: Some(utc("2027-01-01T00:00:00Z")),
            ..rule(Frequency::Yearly)
        };
        assert_eq!(estimate_instance_count(&yearly_until, start, None), 2);

        // Never-ending defaults over a 12 month estimation window.
        assert_eq!(estimate_instance_count(&rule(Frequency::Daily), start, None), 360);
        assert_eq!(estimate_instance_count(&rule(Frequency::Weekly), start, None), 52);
        assert_eq!(estimate_instance_count(&rule(Frequency::Monthly), start, None), 12);
        assert_eq!(estimate_instance_count(&rule(Frequency::Yearly), start, None), 1);
    }
}
