//! Parser for the compact RRULE-like rule string.
//!
//! Supports the subset used by recurring events: FREQ, INTERVAL, BYDAY,
//! BYMONTH, BYMONTHDAY, COUNT, UNTIL. Unknown keys are ignored for forward
//! compatibility rather than rejected.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{RecurrenceError, RecurrenceResult};
use crate::rule::{ByDayEntry, Frequency, RecurrenceRule, weekday_from_code};

/// ## Summary
/// Parses a rule string such as
/// `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=4;UNTIL=2025-02-01T00:00:00Z`
/// into a [`RecurrenceRule`]. `INTERVAL` defaults to 1 when absent.
///
/// ## Errors
/// Returns an error when:
/// - `FREQ` is missing or not one of DAILY/WEEKLY/MONTHLY/YEARLY
/// - `BYDAY` contains a token that is not an optionally ordinal-prefixed
///   two-letter weekday code
/// - `UNTIL` is neither ISO-8601 nor the compact `YYYYMMDDTHHMMSSZ` form
/// - a numeric field does not parse or is out of range
pub fn parse_rrule(input: &str) -> RecurrenceResult<RecurrenceRule> {
    let mut freq: Option<Frequency> = None;
    let mut interval: Option<i32> = None;
    let mut by_day: Vec<ByDayEntry> = Vec::new();
    let mut by_month: Vec<u32> = Vec::new();
    let mut by_month_day: Vec<u32> = Vec::new();
    let mut count: Option<u32> = None;
    let mut until: Option<DateTime<Utc>> = None;

    for part in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            // Malformed fragment without '='; skipped like an unknown key.
            tracing::trace!(fragment = %part, "Skipping malformed RRULE fragment");
            continue;
        };

        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.parse()?),
            "INTERVAL" => {
                let parsed = value.trim().parse::<i32>().map_err(|_| {
                    RecurrenceError::InvalidField {
                        field: "INTERVAL",
                        value: value.to_string(),
                    }
                })?;
                interval = Some(parsed);
            }
            "BYDAY" => {
                by_day = value
                    .split(',')
                    .map(parse_by_day_token)
                    .collect::<RecurrenceResult<Vec<_>>>()?;
            }
            "BYMONTH" => by_month = parse_number_list(value, "BYMONTH", 1, 12)?,
            "BYMONTHDAY" => by_month_day = parse_number_list(value, "BYMONTHDAY", 1, 31)?,
            "COUNT" => {
                let parsed = value.trim().parse::<u32>().map_err(|_| {
                    RecurrenceError::InvalidField {
                        field: "COUNT",
                        value: value.to_string(),
                    }
                })?;
                count = Some(parsed);
            }
            "UNTIL" => until = Some(parse_until(value.trim())?),
            other => {
                tracing::trace!(key = %other, "Ignoring unsupported RRULE key");
            }
        }
    }

    let freq = freq.ok_or(RecurrenceError::MissingFrequency)?;

    Ok(RecurrenceRule {
        freq,
        interval: interval.unwrap_or(1),
        by_day,
        by_month,
        by_month_day,
        count,
        until,
    })
}

/// ## Summary
/// Parses one BYDAY token: a two-letter weekday code optionally preceded by
/// a signed ordinal, e.g. `MO`, `2TU`, `-1FR`.
///
/// ## Errors
/// Returns [`RecurrenceError::InvalidByDay`] for unknown weekday codes, a
/// zero ordinal, or an unparseable prefix.
pub fn parse_by_day_token(token: &str) -> RecurrenceResult<ByDayEntry> {
    let token = token.trim();
    if token.len() < 2 {
        return Err(RecurrenceError::InvalidByDay(token.to_string()));
    }

    let (prefix, code) = token.split_at(token.len() - 2);
    let weekday =
        weekday_from_code(code).ok_or_else(|| RecurrenceError::InvalidByDay(token.to_string()))?;

    let ordinal = if prefix.is_empty() {
        None
    } else {
        let n = prefix
            .parse::<i32>()
            .map_err(|_| RecurrenceError::InvalidByDay(token.to_string()))?;
        if n == 0 {
            return Err(RecurrenceError::InvalidByDay(token.to_string()));
        }
        Some(n)
    };

    Ok(ByDayEntry { ordinal, weekday })
}

fn parse_number_list(
    value: &str,
    field: &'static str,
    min: u32,
    max: u32,
) -> RecurrenceResult<Vec<u32>> {
    value
        .split(',')
        .map(|item| {
            let n = item.trim().parse::<u32>().map_err(|_| {
                RecurrenceError::InvalidField {
                    field,
                    value: item.to_string(),
                }
            })?;
            if n < min || n > max {
                return Err(RecurrenceError::InvalidField {
                    field,
                    value: item.to_string(),
                });
            }
            Ok(n)
        })
        .collect()
}

/// UNTIL accepts ISO-8601 (`2025-02-01T00:00:00Z`) or the compact
/// calendar form (`20250201T000000Z`).
fn parse_until(value: &str) -> RecurrenceResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ") {
        return Ok(naive.and_utc());
    }

    Err(RecurrenceError::InvalidUntil(value.to_string()))
}
