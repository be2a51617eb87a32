//! Model for per-instance exceptions on a recurring series.

use chrono::{DateTime, Utc};
use cadence_recurrence::InstanceException;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored exception: a cancellation or reschedule of one instance,
/// keyed by the instance's original start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventException {
    pub id: Uuid,
    /// Template event the exception belongs to.
    pub event_id: Uuid,
    pub original_start_time: DateTime<Utc>,
    pub is_cancelled: bool,
    /// Replacement start, when rescheduled.
    pub start_at: Option<DateTime<Utc>>,
    /// Replacement end, when rescheduled.
    pub end_at: Option<DateTime<Utc>>,
}

impl EventException {
    /// The overlay form consumed by the generator.
    #[must_use]
    pub fn to_overlay(&self) -> InstanceException {
        InstanceException {
            original_start_time: self.original_start_time,
            is_cancelled: self.is_cancelled,
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}
