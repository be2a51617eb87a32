//! The structured recurrence rule consumed by the generator.

use chrono::{DateTime, Utc, Weekday};

use crate::error::RecurrenceError;

/// Supported recurrence frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(RecurrenceError::UnsupportedFrequency(other.to_string())),
        }
    }
}

/// One BYDAY entry, e.g. `MO` or `2TU` (second Tuesday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByDayEntry {
    /// Ordinal prefix; `Some(2)` for `2TU`, `Some(-1)` for `-1FR` (last
    /// Friday), `None` for a bare weekday.
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

/// A recurrence rule in the subset this engine supports.
///
/// At most one of `count`/`until` meaningfully bounds the series; when both
/// are absent the series is never-ending.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    /// Step between periods. Must be >= 1 to generate; see
    /// [`validate_rule_fields`] for the separate storage-level check.
    pub interval: i32,
    pub by_day: Vec<ByDayEntry>,
    /// Months 1-12.
    pub by_month: Vec<u32>,
    /// Days of month 1-31.
    pub by_month_day: Vec<u32>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    /// Creates a rule with the given frequency and an interval of 1.
    #[must_use]
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            by_day: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            count: None,
            until: None,
        }
    }

    /// A series is never-ending when neither `count` nor `until` bounds it.
    #[must_use]
    pub fn is_never_ending(&self) -> bool {
        self.count.is_none() && self.until.is_none()
    }
}

/// Maps a two-letter weekday code to a weekday. Case-insensitive.
#[must_use]
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code.to_ascii_uppercase().as_str() {
        "SU" => Some(Weekday::Sun),
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        _ => None,
    }
}

/// The two-letter code for a weekday.
#[must_use]
pub const fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

/// ## Summary
/// Shallow plausibility check for rule fields as they come out of storage.
///
/// Returns false for a missing/unknown frequency or a negative interval.
/// An interval of `0` or `None` passes here ("no override") even though the
/// generator rejects anything below 1 — these are two intentionally
/// different validation layers; do not unify them.
#[must_use]
pub fn validate_rule_fields(frequency: &str, interval: Option<i32>) -> bool {
    if frequency.is_empty() || frequency.parse::<Frequency>().is_err() {
        return false;
    }

    if let Some(interval) = interval
        && interval != 0
        && interval < 1
    {
        return false;
    }

    true
}
