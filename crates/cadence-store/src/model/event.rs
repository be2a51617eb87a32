//! Model for recurring template events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring event template.
///
/// Holds the first occurrence's time range; the recurrence rule that expands
/// it is stored separately and joined by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEvent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    /// Start of the first occurrence.
    pub start_at: DateTime<Utc>,
    /// End of the first occurrence; every generated instance keeps this
    /// duration.
    pub end_at: DateTime<Utc>,
}
