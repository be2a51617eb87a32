//! Occurrence generation: expands a recurrence rule into concrete,
//! window-bounded event instances, then overlays per-instance exceptions.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

use crate::dates::{add_days, add_months_safely, add_weeks, days_in_month, nth_weekday_of_month, start_of_week};
use crate::error::{RecurrenceError, RecurrenceResult};
use crate::rule::{Frequency, RecurrenceRule};

/// One concrete realization of a recurring template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Start time the rule produced; stable across exception overlays, used
    /// as the matching key for exceptions and idempotent upserts.
    pub original_start_time: DateTime<Utc>,
    /// Start time after any modification exception.
    pub actual_start_time: DateTime<Utc>,
    /// End time after any modification exception.
    pub actual_end_time: DateTime<Utc>,
    pub is_cancelled: bool,
    /// 1-based position in the series. Cancelled slots keep their number.
    pub sequence_number: u32,
    /// Series length: the rule's `count` when bounded by count, otherwise
    /// the generated length of this call (provisional for unbounded series).
    pub total_count: u32,
}

/// An override for a single instance, keyed by its original start time.
///
/// Either a cancellation or a replacement time range; produced by an
/// external editing collaborator and consumed read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceException {
    pub original_start_time: DateTime<Utc>,
    pub is_cancelled: bool,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Safety limits for a single generation call.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorLimits {
    /// Hard cap on candidate periods considered, so never-ending series and
    /// patterns that produce no candidates (e.g. a sixth Friday) always
    /// terminate.
    pub max_iterations: u32,
}

impl Default for GeneratorLimits {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
        }
    }
}

/// ## Summary
/// Expands a recurrence rule into the ordered occurrences of the template
/// event that touch the `[window_start, window_end]` window.
///
/// The series always starts at `template_start`; every occurrence keeps the
/// template's duration. Occurrences before the window still consume
/// sequence numbers and count toward `count`, so re-generation over a later
/// window is consistent with earlier windows.
///
/// ## Errors
/// Returns [`RecurrenceError::IntervalOutOfRange`] when the rule's interval
/// is below 1.
pub fn generate_occurrences(
    template_start: DateTime<Utc>,
    template_end: DateTime<Utc>,
    rule: &RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> RecurrenceResult<Vec<Occurrence>> {
    generate_occurrences_with_limits(
        template_start,
        template_end,
        rule,
        window_start,
        window_end,
        GeneratorLimits::default(),
    )
}

/// Same as [`generate_occurrences`] with an explicit safety limit.
///
/// ## Errors
/// Returns [`RecurrenceError::IntervalOutOfRange`] when the rule's interval
/// is below 1.
pub fn generate_occurrences_with_limits(
    template_start: DateTime<Utc>,
    template_end: DateTime<Utc>,
    rule: &RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    limits: GeneratorLimits,
) -> RecurrenceResult<Vec<Occurrence>> {
    if rule.interval < 1 {
        return Err(RecurrenceError::IntervalOutOfRange);
    }

    let duration = template_end.signed_duration_since(template_start);
    let mut occurrences: Vec<Occurrence> = Vec::new();
    let mut sequence: u32 = 1;
    let mut iterations: u32 = 0;

    'series: while iterations < limits.max_iterations {
        let Some(period) = period_candidates(rule, template_start, iterations) else {
            break;
        };
        iterations += 1;

        // Periods advance monotonically; once the earliest possible
        // candidate of a period passes the window, nothing later can fit.
        if period.floor > window_end {
            break;
        }

        for candidate in period.candidates {
            if let Some(until) = rule.until
                && candidate > until
            {
                break 'series;
            }
            if candidate > window_end {
                break 'series;
            }
            if let Some(count) = rule.count
                && sequence > count
            {
                break 'series;
            }

            if candidate + duration >= window_start {
                occurrences.push(Occurrence {
                    original_start_time: candidate,
                    actual_start_time: candidate,
                    actual_end_time: candidate + duration,
                    is_cancelled: false,
                    sequence_number: sequence,
                    total_count: rule.count.unwrap_or(0),
                });
            }

            sequence += 1;
        }
    }

    if iterations >= limits.max_iterations {
        tracing::warn!(
            freq = %rule.freq,
            interval = rule.interval,
            max_iterations = limits.max_iterations,
            "Occurrence generation hit the iteration safety cap"
        );
    }

    if rule.count.is_none() {
        let total = u32::try_from(occurrences.len()).unwrap_or(u32::MAX);
        for occurrence in &mut occurrences {
            occurrence.total_count = total;
        }
    }

    Ok(occurrences)
}

/// ## Summary
/// Overlays exceptions onto generated occurrences, matching by
/// `original_start_time`. Cancellations flag the slot without removing it;
/// modifications overwrite only the actual times, leaving the original
/// start intact so re-applying the same exception is a no-op.
pub fn apply_exceptions(occurrences: &mut [Occurrence], exceptions: &[InstanceException]) {
    if exceptions.is_empty() {
        return;
    }

    let by_time: HashMap<DateTime<Utc>, &InstanceException> = exceptions
        .iter()
        .map(|exception| (exception.original_start_time, exception))
        .collect();

    for occurrence in occurrences {
        let Some(exception) = by_time.get(&occurrence.original_start_time) else {
            continue;
        };

        if let Some(start_at) = exception.start_at {
            occurrence.actual_start_time = start_at;
        }
        if let Some(end_at) = exception.end_at {
            occurrence.actual_end_time = end_at;
        }
        if exception.is_cancelled {
            occurrence.is_cancelled = true;
        }
    }
}

/// Generation plus exception overlay in one call.
///
/// ## Errors
/// Returns [`RecurrenceError::IntervalOutOfRange`] when the rule's interval
/// is below 1.
pub fn generate_materialized_occurrences(
    template_start: DateTime<Utc>,
    template_end: DateTime<Utc>,
    rule: &RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    exceptions: &[InstanceException],
    limits: GeneratorLimits,
) -> RecurrenceResult<Vec<Occurrence>> {
    let mut occurrences = generate_occurrences_with_limits(
        template_start,
        template_end,
        rule,
        window_start,
        window_end,
        limits,
    )?;
    apply_exceptions(&mut occurrences, exceptions);
    Ok(occurrences)
}

/// The candidates of one period, plus a lower bound on anything the period
/// could produce (used to detect when the window has been passed).
struct Period {
    floor: DateTime<Utc>,
    candidates: Vec<DateTime<Utc>>,
}

fn period_candidates(rule: &RecurrenceRule, template_start: DateTime<Utc>, k: u32) -> Option<Period> {
    let step = i64::from(k) * i64::from(rule.interval);
    let time = template_start.time();

    match rule.freq {
        Frequency::Daily => {
            let candidate = add_days(template_start, step);
            Some(Period {
                floor: candidate,
                candidates: vec![candidate],
            })
        }
        Frequency::Weekly => {
            if rule.by_day.is_empty() {
                let candidate = add_weeks(template_start, step);
                return Some(Period {
                    floor: candidate,
                    candidates: vec![candidate],
                });
            }

            let week = add_weeks(start_of_week(template_start), step);
            let offsets: BTreeSet<u32> = rule
                .by_day
                .iter()
                .map(|entry| entry.weekday.num_days_from_sunday())
                .collect();
            let candidates = offsets
                .into_iter()
                .map(|offset| add_days(week, i64::from(offset)))
                .filter(|candidate| *candidate >= template_start)
                .collect();
            Some(Period {
                floor: week,
                candidates,
            })
        }
        Frequency::Monthly => {
            let months = i32::try_from(step).ok()?;
            let anchor = add_months_safely(template_start, months);
            if months > 0 && anchor == template_start {
                // Out of chrono's date range.
                return None;
            }
            monthly_period(rule, template_start, anchor, time)
        }
        Frequency::Yearly => {
            let months = i32::try_from(step.checked_mul(12)?).ok()?;
            let anchor = add_months_safely(template_start, months);
            if months > 0 && anchor == template_start {
                return None;
            }
            yearly_period(rule, template_start, anchor, time)
        }
    }
}

fn monthly_period(
    rule: &RecurrenceRule,
    template_start: DateTime<Utc>,
    anchor: DateTime<Utc>,
    time: NaiveTime,
) -> Option<Period> {
    let year = anchor.year();
    let month = anchor.month();

    if rule.by_day.iter().any(|entry| entry.ordinal.is_some()) {
        // Ordinal weekday pattern, e.g. "2TU" = second Tuesday. Entries
        // without an ordinal never match in a monthly rule.
        let mut dates: Vec<NaiveDate> = rule
            .by_day
            .iter()
            .filter_map(|entry| {
                let ordinal = entry.ordinal?;
                nth_weekday_of_month(year, month, entry.weekday, ordinal)
            })
            .collect();
        dates.sort_unstable();
        dates.dedup();

        let candidates = dates
            .into_iter()
            .map(|date| at_time(date, time))
            .filter(|candidate| *candidate >= template_start)
            .collect();
        Some(Period {
            floor: first_of_month(year, month, time)?,
            candidates,
        })
    } else if rule.by_day.is_empty() && !rule.by_month_day.is_empty() {
        let month_len = days_in_month(year, month)?;
        let days: BTreeSet<u32> = rule.by_month_day.iter().copied().collect();
        let candidates = days
            .into_iter()
            .filter(|day| *day <= month_len)
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .map(|date| at_time(date, time))
            .filter(|candidate| *candidate >= template_start)
            .collect();
        Some(Period {
            floor: first_of_month(year, month, time)?,
            candidates,
        })
    } else if rule.by_day.is_empty() {
        // Plain monthly series: the safe month addition from the template
        // start keeps a day-31 template on day 31 wherever possible.
        Some(Period {
            floor: anchor,
            candidates: vec![anchor],
        })
    } else {
        // Non-ordinal BYDAY in a monthly rule produces nothing.
        Some(Period {
            floor: first_of_month(year, month, time)?,
            candidates: Vec::new(),
        })
    }
}

fn yearly_period(
    rule: &RecurrenceRule,
    template_start: DateTime<Utc>,
    anchor: DateTime<Utc>,
    time: NaiveTime,
) -> Option<Period> {
    if rule.by_month.is_empty() && rule.by_month_day.is_empty() {
        return Some(Period {
            floor: anchor,
            candidates: vec![anchor],
        });
    }

    let year = anchor.year();
    let months: BTreeSet<u32> = if rule.by_month.is_empty() {
        BTreeSet::from([anchor.month()])
    } else {
        rule.by_month.iter().copied().collect()
    };
    let days: BTreeSet<u32> = if rule.by_month_day.is_empty() {
        BTreeSet::from([template_start.day()])
    } else {
        rule.by_month_day.iter().copied().collect()
    };

    let mut candidates = Vec::new();
    for month in months {
        let Some(month_len) = days_in_month(year, month) else {
            continue;
        };
        for day in &days {
            if *day > month_len {
                continue;
            }
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, *day) {
                let candidate = at_time(date, time);
                if candidate >= template_start {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates.sort_unstable();

    Some(Period {
        floor: first_of_month(year, 1, time)?,
        candidates,
    })
}

fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

fn first_of_month(year: i32, month: u32, time: NaiveTime) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|date| at_time(date, time))
}
