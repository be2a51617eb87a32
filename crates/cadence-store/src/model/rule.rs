//! Model for stored recurrence rules.

use chrono::{DateTime, Utc};
use cadence_recurrence::{RecurrenceResult, RecurrenceRule, parse_by_day_token};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurrence rule as persisted: loosely typed, validated on the way into
/// the generator rather than on the way into storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecurrenceRule {
    pub id: Uuid,
    /// Template event this rule expands.
    pub event_id: Uuid,
    pub organization_id: Uuid,
    /// Frequency name, e.g. `DAILY`. Unknown values fail conversion.
    pub frequency: String,
    /// Step between periods; `None` means the default of 1.
    pub interval: Option<i32>,
    /// BYDAY tokens, e.g. `MO` or `2TU`. Unparseable tokens are skipped
    /// during conversion instead of failing the whole series.
    pub by_day: Vec<String>,
    /// Months 1-12.
    pub by_month: Vec<u32>,
    /// Days of month 1-31.
    pub by_month_day: Vec<u32>,
    pub count: Option<u32>,
    pub recurrence_start_date: DateTime<Utc>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
}

impl StoredRecurrenceRule {
    /// Whether neither a count nor an end date bounds the series.
    #[must_use]
    pub fn is_never_ending(&self) -> bool {
        self.count.is_none() && self.recurrence_end_date.is_none()
    }

    /// ## Summary
    /// Converts the stored form into the typed rule the generator consumes.
    /// BYDAY tokens that fail to parse are dropped with a warning so one bad
    /// token cannot wedge an otherwise valid series.
    ///
    /// ## Errors
    /// Returns an error when the frequency is unknown.
    pub fn to_engine_rule(&self) -> RecurrenceResult<RecurrenceRule> {
        let freq = self.frequency.parse()?;

        let by_day = self
            .by_day
            .iter()
            .filter_map(|token| match parse_by_day_token(token) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!(
                        rule_id = %self.id,
                        token = %token,
                        %error,
                        "Skipping unparseable BYDAY token"
                    );
                    None
                }
            })
            .collect();

        Ok(RecurrenceRule {
            freq,
            interval: self.interval.unwrap_or(1),
            by_day,
            by_month: self.by_month.clone(),
            by_month_day: self.by_month_day.clone(),
            count: self.count,
            until: self.recurrence_end_date,
        })
    }
}
