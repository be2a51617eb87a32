//! Models for materialized event instances.

use chrono::{DateTime, Utc};
use cadence_recurrence::Occurrence;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A concrete, stored instance of a recurring event.
///
/// `(event_id, original_start_time)` is the natural key; re-materializing a
/// window upserts against it so instances are never duplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedInstance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub organization_id: Uuid,
    /// Rule-produced start time; stable across exception overlays.
    pub original_start_time: DateTime<Utc>,
    pub actual_start_time: DateTime<Utc>,
    pub actual_end_time: DateTime<Utc>,
    pub is_cancelled: bool,
    /// 1-based position in the series.
    pub sequence_number: u32,
    /// Series length, or the window-limited count for unbounded series.
    pub total_count: u32,
    pub generated_at: DateTime<Utc>,
}

/// A new instance ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterializedInstance {
    pub event_id: Uuid,
    pub organization_id: Uuid,
    pub original_start_time: DateTime<Utc>,
    pub actual_start_time: DateTime<Utc>,
    pub actual_end_time: DateTime<Utc>,
    pub is_cancelled: bool,
    pub sequence_number: u32,
    pub total_count: u32,
}

impl NewMaterializedInstance {
    /// Builds an insertable instance from a generated occurrence.
    #[must_use]
    pub fn from_occurrence(event_id: Uuid, organization_id: Uuid, occurrence: &Occurrence) -> Self {
        Self {
            event_id,
            organization_id,
            original_start_time: occurrence.original_start_time,
            actual_start_time: occurrence.actual_start_time,
            actual_end_time: occurrence.actual_end_time,
            is_cancelled: occurrence.is_cancelled,
            sequence_number: occurrence.sequence_number,
            total_count: occurrence.total_count,
        }
    }
}
